// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use crate::display::TargetCfgDbByTag;
use crate::targets::{TRACING_TARGETS, TargetKind};
use crate::trace_target;
use ordermap::OrderMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, prelude::*, reload};

trace_target!("tracectl", LevelFilter::INFO, &[]);

/// Errors when applying a tracing configuration string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceCtlError {
    #[error("invalid syntax '{0}': it should be tag=loglevel")]
    InvalidSyntax(String),
    #[error("invalid level '{level}': {reason}")]
    InvalidLevel { level: String, reason: String },
}

/// The configuration of a tracing target
#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: Vec<&'static str>,
    pub(crate) kind: TargetKind,
}
impl TargetCfg {
    fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        kind: TargetKind,
    ) -> Self {
        // the name is always a tag
        let mut tags = tags.to_vec();
        if !tags.contains(&name) {
            tags.push(name);
        }
        Self {
            target,
            name,
            level,
            tags,
            kind,
        }
    }
    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
    #[must_use]
    pub fn level(&self) -> LevelFilter {
        self.level
    }
    #[must_use]
    pub fn tags(&self) -> &[&'static str] {
        &self.tags
    }
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        self.kind
    }
}

/// A tag and the targets it selects
#[derive(Debug, Clone)]
pub struct Tag {
    pub(crate) tag: &'static str,
    pub(crate) targets: HashSet<&'static str>,
}
impl Tag {
    fn new(tag: &'static str, target: &'static str) -> Self {
        let mut targets = HashSet::with_capacity(1);
        targets.insert(target);
        Self { tag, targets }
    }
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.tag
    }
}

#[derive(Debug)]
pub(crate) struct TargetCfgDb {
    pub(crate) level: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
    pub(crate) tags: OrderMap<&'static str, Tag>,
}

impl TargetCfgDb {
    fn new(level: LevelFilter) -> Self {
        let mut db = Self {
            level,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for target in TRACING_TARGETS {
            db.register(
                target.target,
                target.name,
                target.level,
                target.tags,
                target.kind,
            );
        }
        db
    }
    fn register(
        &mut self,
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        kind: TargetKind,
    ) {
        let tconfig = TargetCfg::new(target, name, level, tags, kind);
        let tags = tconfig.tags.clone();

        if let Some(exist) = self.targets.insert(target, tconfig) {
            warn!("Target {} has been multiply defined!", exist.target);
        }
        for tag in tags {
            if let Some(known) = self.tags.get_mut(tag) {
                known.targets.insert(target);
            } else {
                self.tags.insert(tag, Tag::new(tag, target));
            }
        }
    }
    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.level.to_string());
        for target in self.targets.values() {
            match format!("{}={}", target.target, target.level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => warn!("Skipping target {}: {e}", target.target),
            }
        }
        filter
    }
    /// A configuration string that would yield the current levels.
    pub(crate) fn as_config_string(&self) -> String {
        let mut out = format!("default={}", self.level);
        for target in self.targets.values() {
            out += format!(",{}={}", target.name, target.level).as_str();
        }
        out
    }
    fn tag_targets_mut(&mut self, tag: &str) -> impl Iterator<Item = &mut TargetCfg> {
        let selected = self.tags.get(tag).map(|t| t.targets.clone()).unwrap_or_default();
        self.targets
            .values_mut()
            .filter(move |target| selected.contains(target.target))
    }
    pub(crate) fn tag_targets(&self, tag: &str) -> impl Iterator<Item = &TargetCfg> {
        let selected = self.tags.get(tag);
        self.targets
            .values()
            .filter(move |target| selected.is_some_and(|t| t.targets.contains(target.target)))
    }
}

/// Runtime handle over the levels of all tracing targets
#[derive(Debug)]
pub struct TracingControl {
    db: Mutex<TargetCfgDb>,
    reload_filter: reload::Handle<EnvFilter, Registry>,
}

impl TracingControl {
    fn new() -> Self {
        let db = TargetCfgDb::new(LevelFilter::INFO);
        let (filter, reload_filter) = reload::Layer::new(db.env_filter());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(true)
            .with_level(true);

        if let Err(e) = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
        {
            // a subscriber was installed first (e.g. by a test harness): levels still get tracked
            eprintln!("Tracing subscriber already set: {e}");
        }

        Self {
            db: Mutex::new(db),
            reload_filter,
        }
    }
    fn reload(&self, filter: EnvFilter) {
        if let Err(e) = self.reload_filter.reload(filter) {
            error!("Failed to reload tracing filter: {e}");
        }
    }
    #[cfg(test)]
    fn register(
        &self,
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        kind: TargetKind,
    ) {
        let mut db = self.db.lock();
        db.register(target, name, level, tags, kind);
        self.reload(db.env_filter());
    }

    /// Parse comma-separated tag=level items, where level is one of off, error, warn, info,
    /// debug or trace
    fn parse_tracing_config(input: &str) -> Result<OrderMap<String, LevelFilter>, TraceCtlError> {
        let mut result = OrderMap::new();
        for item in input.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            let Some((tag, level)) = item.split_once('=') else {
                return Err(TraceCtlError::InvalidSyntax(item.to_string()));
            };
            let level = level.trim();
            let parsed =
                LevelFilter::from_str(level).map_err(|e| TraceCtlError::InvalidLevel {
                    level: level.to_string(),
                    reason: e.to_string(),
                })?;
            result.insert(tag.trim().to_string(), parsed);
        }
        Ok(result)
    }
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get a reference to the process-wide [`TracingControl`], initializing it if needed
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::new)
}

impl TracingControl {
    pub fn init() {
        get_trace_ctl();
    }
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) {
        let mut db = self.db.lock();
        let mut changed = 0;
        for target in db.tag_targets_mut(tag) {
            if target.level != level {
                target.level = level;
                changed += 1;
            }
        }
        if changed > 0 {
            self.reload(db.env_filter());
        }
        info!("Changed log level for tag '{tag}' to {level}. Targets changed: {changed}");
    }
    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.db.lock();
        for target in db.targets.values_mut() {
            target.level = level;
        }
        self.reload(db.env_filter());
    }
    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.db.lock();
        if db.level != level {
            db.level = level;
            info!("Set default log level to {level}");
            self.reload(db.env_filter());
        }
    }
    #[must_use]
    pub fn get_default_level(&self) -> LevelFilter {
        self.db.lock().level
    }

    /// Apply a configuration like `default=error,all=info,nat=debug`.
    ///
    /// `default` sets the level of anything not declared as a target, `all` sets every declared
    /// target, and the remaining items set the targets of a tag. Items apply in that order.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        let config = Self::parse_tracing_config(input)?;
        if let Some(level) = config.get("default") {
            self.set_default_level(*level);
        }
        if let Some(level) = config.get("all") {
            self.set_level_all(*level);
        }
        for (tag, level) in &config {
            if tag != "default" && tag != "all" {
                self.set_tag_level(tag, *level);
            }
        }
        Ok(())
    }

    pub fn get_tags(&self) -> impl Iterator<Item = Tag> {
        self.db.lock().tags.clone().into_values()
    }
    #[must_use]
    pub fn get_tag(&self, tag: &str) -> Option<Tag> {
        self.db.lock().tags.get(tag).cloned()
    }
    #[must_use]
    pub fn get_target(&self, target: &str) -> Option<TargetCfg> {
        self.db.lock().targets.get(target).cloned()
    }
    pub fn get_targets_by_tag(&self, tag: &str) -> impl Iterator<Item = TargetCfg> {
        let db = self.db.lock();
        db.tag_targets(tag).cloned().collect::<Vec<_>>().into_iter()
    }
    pub fn dump(&self) {
        let db = self.db.lock();
        info!("{db}");
    }
    #[must_use]
    pub fn targets_by_tag_string(&self) -> String {
        let db = self.db.lock();
        TargetCfgDbByTag(&db).to_string()
    }
    #[must_use]
    pub fn as_config_string(&self) -> String {
        self.db.lock().as_config_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::control::{TraceCtlError, get_trace_ctl};
    use crate::targets::{TRACING_TARGETS, TargetKind};
    use crate::{LevelFilter, custom_target};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_auto_register_macro() {
        custom_target!("target-1", LevelFilter::ERROR, &[]);
        custom_target!("target-2", LevelFilter::WARN, &["pair"]);

        // linkme collects targets declared anywhere, even after this line
        let static_targets: Vec<&str> = TRACING_TARGETS.iter().map(|c| c.target).collect();
        assert!(static_targets.contains(&"sdwan_tracectl::control"));
        assert!(static_targets.contains(&"target-1"));
        assert!(static_targets.contains(&"target-3"));

        let tctl = get_trace_ctl();
        assert!(tctl.get_target("target-1").is_some());
        assert!(tctl.get_target("target-3").is_some());
        assert!(tctl.get_tag("pair").is_some());
        assert_eq!(tctl.get_target("target-1").unwrap().kind(), TargetKind::Custom);
        let own = tctl.get_target("sdwan_tracectl::control").unwrap();
        assert_eq!((own.name(), own.kind()), ("tracectl", TargetKind::Module));

        custom_target!("target-3", LevelFilter::OFF, &["pair"]);
        assert_eq!(tctl.get_targets_by_tag("pair").count(), 2);
        assert!(tctl.targets_by_tag_string().contains("pair:"));
    }

    #[test]
    #[serial]
    fn test_change_tag_level() {
        const TAG: &str = "common-tag";
        custom_target!("t1", LevelFilter::DEBUG, &[TAG]);
        custom_target!("t2", LevelFilter::ERROR, &[TAG]);

        let tctl = get_trace_ctl();
        assert_eq!(tctl.get_target("t1").unwrap().level(), LevelFilter::DEBUG);
        tctl.set_tag_level(TAG, LevelFilter::OFF);
        assert_eq!(tctl.get_target("t1").unwrap().level(), LevelFilter::OFF);
        assert_eq!(tctl.get_target("t2").unwrap().level(), LevelFilter::OFF);

        // the name of a target is one of its tags
        tctl.set_tag_level("t2", LevelFilter::TRACE);
        assert_eq!(tctl.get_target("t1").unwrap().level(), LevelFilter::OFF);
        assert_eq!(tctl.get_target("t2").unwrap().level(), LevelFilter::TRACE);
    }

    #[test]
    #[serial]
    fn test_setup_from_string() {
        custom_target!("setup-a", LevelFilter::INFO, &["setup"]);
        custom_target!("setup-b", LevelFilter::INFO, &[]);

        let tctl = get_trace_ctl();
        tctl.register("late", "late", LevelFilter::INFO, &["setup"], TargetKind::Custom);
        tctl.setup_from_string("default=error, setup=debug,setup-b=warn")
            .unwrap();
        assert_eq!(tctl.get_default_level(), LevelFilter::ERROR);
        tctl.get_targets_by_tag("setup")
            .for_each(|t| assert_eq!(t.level(), LevelFilter::DEBUG));
        assert_eq!(tctl.get_target("setup-b").unwrap().level(), LevelFilter::WARN);
        assert!(tctl.as_config_string().starts_with("default=error"));

        assert!(matches!(
            tctl.setup_from_string("setup=bad"),
            Err(TraceCtlError::InvalidLevel { .. })
        ));
        assert_eq!(
            tctl.setup_from_string("setup=error, foo"),
            Err(TraceCtlError::InvalidSyntax("foo".to_string()))
        );
        tctl.set_default_level(LevelFilter::INFO);
    }
}
