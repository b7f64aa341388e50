use std::fmt;

use crate::platform::environment::Capabilities;
use crate::tracker::config::TransportPreference;

/// Delivery mechanism fixed for a configured client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolvedTransport {
    Direct,
    Script,
    Pixel,
}

impl ResolvedTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedTransport::Direct => "direct",
            ResolvedTransport::Script => "script",
            ResolvedTransport::Pixel => "pixel",
        }
    }
}

impl fmt::Display for ResolvedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the transport for a client.
///
/// `Auto` and `Direct` fall back to script injection when the environment cannot deliver typed
/// responses. An explicit `Script` or `Pixel` choice is never overridden. No configuration is
/// rejected here: an environment without any working transport shows up as per-call failures.
pub fn resolve(preference: TransportPreference, capabilities: &Capabilities) -> ResolvedTransport {
    match preference {
        TransportPreference::Auto | TransportPreference::Direct => {
            if capabilities.typed_responses {
                ResolvedTransport::Direct
            } else {
                ResolvedTransport::Script
            }
        }
        TransportPreference::Script => ResolvedTransport::Script,
        TransportPreference::Pixel => ResolvedTransport::Pixel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODERN: Capabilities = Capabilities::new(true);
    const LEGACY: Capabilities = Capabilities::new(false);

    #[test]
    fn auto_prefers_direct_when_typed_responses_exist() {
        assert_eq!(resolve(TransportPreference::Auto, &MODERN), ResolvedTransport::Direct);
        assert_eq!(resolve(TransportPreference::Direct, &MODERN), ResolvedTransport::Direct);
    }

    #[test]
    fn auto_degrades_to_script_in_legacy_environments() {
        assert_eq!(resolve(TransportPreference::Auto, &LEGACY), ResolvedTransport::Script);
        assert_eq!(resolve(TransportPreference::Direct, &LEGACY), ResolvedTransport::Script);
    }

    #[test]
    fn explicit_choices_ignore_capabilities() {
        for capabilities in [MODERN, LEGACY] {
            assert_eq!(
                resolve(TransportPreference::Pixel, &capabilities),
                ResolvedTransport::Pixel
            );
            assert_eq!(
                resolve(TransportPreference::Script, &capabilities),
                ResolvedTransport::Script
            );
        }
    }
}
