// [apps/guardian/src/probe/registry.rs]
//! Process-global ordered table of probes, built once at startup and
//! immutable thereafter (`spec.md` §4.3). No synchronization is required:
//! the table never changes shape after `ProbeRegistry::new`.

use super::Probe;
use std::sync::Arc;

pub struct ProbeRegistry {
    /// Insertion order is the dashboard's display order; lookup is a linear
    /// scan over at most sixteen entries, which is indistinguishable from
    /// O(1) at this scale and avoids pulling in a second keyed collection
    /// with its own ordering semantics to keep in sync with `entries`.
    entries: Vec<(&'static str, Arc<dyn Probe>)>,
}

impl ProbeRegistry {
    pub fn new(probes: Vec<Arc<dyn Probe>>) -> Self {
        let entries = probes.into_iter().map(|p| (p.id(), p)).collect();
        Self { entries }
    }

    pub fn get(&self, probe_id: &str) -> Option<Arc<dyn Probe>> {
        self.entries.iter().find(|(id, _)| *id == probe_id).map(|(_, p)| p.clone())
    }

    /// All registered probes, dashboard display order.
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Probe>> {
        self.entries.iter().map(|(_, p)| p)
    }

    /// The subset of registered probes that are currently configured —
    /// "active probes" in the glossary's sense.
    pub fn configured(&self) -> impl Iterator<Item = &Arc<dyn Probe>> {
        self.entries.iter().map(|(_, p)| p).filter(|p| p.is_configured())
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeContext, ProbeResult};
    use async_trait::async_trait;

    struct StubProbe {
        id: &'static str,
        configured: bool,
    }

    #[async_trait]
    impl Probe for StubProbe {
        fn id(&self) -> &'static str {
            self.id
        }
        fn display_name(&self) -> &'static str {
            "Stub"
        }
        fn is_configured(&self) -> bool {
            self.configured
        }
        async fn execute(&self, _ctx: &ProbeContext) -> ProbeResult {
            ProbeResult::skipped(self.id, "Stub", &[])
        }
    }

    #[test]
    fn lookup_is_stable_and_unknown_ids_are_none() {
        let registry = ProbeRegistry::new(vec![
            Arc::new(StubProbe { id: "a", configured: true }),
            Arc::new(StubProbe { id: "b", configured: false }),
        ]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("zzz").is_none());
        assert_eq!(registry.configured().count(), 1);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
