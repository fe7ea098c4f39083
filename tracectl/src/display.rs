// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Listings of the tracing targets

use crate::control::{TargetCfg, TargetCfgDb};
use crate::targets::TargetKind;
use std::fmt::Display;

const RULE: &str = "──────────────────────────────────────────────────────────────────────";

impl Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Module => f.pad("module"),
            TargetKind::Custom => f.pad("custom"),
        }
    }
}

impl Display for TargetCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<12} {:<36} {:<6} {:<6} [{}]",
            self.name,
            self.target,
            self.kind,
            self.level,
            self.tags.join(" ")
        )
    }
}

impl Display for TargetCfgDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "tracing targets (default level {})", self.level)?;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "{:<12} {:<36} {:<6} {:<6} TAGS",
            "NAME", "TARGET", "KIND", "LEVEL"
        )?;
        for target in self.targets.values() {
            writeln!(f, "{target}")?;
        }
        write!(f, "{RULE}")
    }
}

/// The targets under each tag, as `--show-tracing-tags` prints them
pub(crate) struct TargetCfgDbByTag<'a>(pub(crate) &'a TargetCfgDb);

impl Display for TargetCfgDbByTag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let db = self.0;
        for tag in db.tags.values() {
            let targets: Vec<String> = db
                .tag_targets(tag.tag)
                .map(|t| format!("{}={}", t.name, t.level))
                .collect();
            writeln!(f, "{:<16} {}", format!("{}:", tag.tag), targets.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::LevelFilter;
    use crate::control::TargetCfg;
    use crate::targets::TargetKind;

    #[test]
    fn target_line() {
        let cfg = TargetCfg {
            target: "sdwan_nat::engine",
            name: "nat",
            level: LevelFilter::DEBUG,
            tags: vec!["pipeline", "nat"],
            kind: TargetKind::Module,
        };
        let line = cfg.to_string();
        assert!(line.starts_with("nat "));
        assert!(line.contains("sdwan_nat::engine"));
        assert!(line.contains("module"));
        assert!(line.contains("DEBUG") || line.contains("debug"));
        assert!(line.ends_with("[pipeline nat]"));
    }
}
