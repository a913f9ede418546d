//! Channel Router Element
//!
//! Rebuilds every channel of the buffer from explicit routes, e.g. a stereo
//! swap or folding the centre into the front pair. Channels no route targets
//! come out silent. Without routes the buffer passes through.

use parking_lot::Mutex;
use tracing::debug;

use crate::audio::{ChannelRoute, Format};
use crate::element::Element;
use crate::error::ElementResult;
use crate::samples::Samples;

struct Router {
    routes: Vec<ChannelRoute>,
    // Copy of the input the routes read from
    scratch: Samples,
}

pub struct ChannelRouter {
    inner: Mutex<Router>,
}

impl ChannelRouter {
    pub fn new() -> Self {
        Self::with_routes(Vec::new())
    }

    pub fn with_routes(routes: Vec<ChannelRoute>) -> Self {
        Self {
            inner: Mutex::new(Router {
                routes,
                scratch: Samples::new(0, Format::default()),
            }),
        }
    }

    /// Replace the route table; an empty table turns routing off
    pub fn set_routes(&self, routes: Vec<ChannelRoute>) {
        debug!(routes = routes.len(), "channel routes set");
        self.inner.lock().routes = routes;
    }

    pub fn routes(&self) -> Vec<ChannelRoute> {
        self.inner.lock().routes.clone()
    }
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for ChannelRouter {
    fn name(&self) -> &str {
        "ChannelRouter"
    }

    fn stream(&self, samples: &mut Samples) -> ElementResult<()> {
        let mut guard = self.inner.lock();
        let router = &mut *guard;
        if router.routes.is_empty() {
            return Ok(());
        }

        let delivered = samples.delivered();
        let scratch = &mut router.scratch;
        scratch.set_format(*samples.format())?;
        scratch.resize(samples.len());
        for (copy, plane) in scratch.planes_mut()?.zip(samples.planes()?) {
            copy.copy_from_slice(plane);
        }
        scratch.set_delivered(delivered);

        samples.silence();
        samples.set_delivered(0);
        samples.mix_routes(scratch, &router.routes, 0, 0)?;
        samples.set_delivered(delivered);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Channel, ChannelLayout, Rate};

    fn filled(layout: ChannelLayout, values: &[f64]) -> Samples {
        let mut s = Samples::new(2, Format::internal(Rate::R48000, layout));
        for (plane, &v) in s.planes_mut().unwrap().zip(values) {
            plane.fill(v);
        }
        s.set_delivered(2);
        s
    }

    #[test]
    fn test_no_routes_is_passthrough() {
        let router = ChannelRouter::new();
        let mut s = filled(ChannelLayout::STEREO, &[0.25, 0.5]);
        router.stream(&mut s).unwrap();
        assert_eq!(s.plane(0).unwrap(), &[0.25, 0.25]);
        assert_eq!(s.plane(1).unwrap(), &[0.5, 0.5]);
    }

    #[test]
    fn test_stereo_swap() {
        let router = ChannelRouter::with_routes(vec![
            ChannelRoute::new(Channel::FrontLeft, [Channel::FrontRight]),
            ChannelRoute::new(Channel::FrontRight, [Channel::FrontLeft]),
        ]);
        let mut s = filled(ChannelLayout::STEREO, &[0.25, 0.5]);
        router.stream(&mut s).unwrap();
        assert_eq!(s.channel(Channel::FrontLeft).unwrap(), &[0.5, 0.5]);
        assert_eq!(s.channel(Channel::FrontRight).unwrap(), &[0.25, 0.25]);
        assert_eq!(s.delivered(), 2);
    }

    #[test]
    fn test_fold_and_untargeted_silence() {
        let router = ChannelRouter::new();
        router.set_routes(vec![ChannelRoute::new(
            Channel::FrontLeft,
            [Channel::FrontLeft, Channel::FrontRight],
        )]);
        assert_eq!(router.routes().len(), 1);

        let mut s = filled(ChannelLayout::STEREO, &[0.25, 0.5]);
        router.stream(&mut s).unwrap();
        assert_eq!(s.plane(0).unwrap(), &[0.75, 0.75]);
        assert_eq!(s.plane(1).unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn test_missing_role_skipped() {
        let router = ChannelRouter::with_routes(vec![ChannelRoute::new(
            Channel::FrontLeft,
            [Channel::FrontCenter],
        )]);
        let mut s = filled(ChannelLayout::STEREO, &[0.25, 0.5]);
        router.stream(&mut s).unwrap();
        assert!(s.planes().unwrap().all(|p| p.iter().all(|&x| x == 0.0)));
        assert_eq!(s.delivered(), 2);
    }
}
