//! Leak command implementation.
//!
//! Each round defines a class in a fresh loader, uses its handles through a
//! long-lived dispatch site, and drops every strong reference. The loaders
//! must then become unreachable even though the site still holds entries
//! for their handles.

use std::time::Instant;

use vhx_rt::class::FieldDesc;
use vhx_rt::object::{ArrayObject, Instance, ObjectRef};
use vhx_rt::runtime::LoaderWatch;
use vhx_rt::{Access, AccessSite, ClassDesc, ElementType, Runtime, Value};

use crate::config::LeakConfig;
use crate::error::{Result, VhxtError};

/// Arguments for the leak command.
#[derive(Debug, Clone, Default)]
pub struct LeakArgs {
    /// Loaders to define and drop (default: from config).
    pub rounds: Option<u32>,
}

/// Summary of a leak run.
#[derive(Debug, Clone)]
pub struct LeakReport {
    pub rounds: u32,
    /// Attempt on which every loader was found reclaimed.
    pub reclaimed_after: Option<u32>,
    pub max_attempts: u32,
    /// Site entries still cached after reclamation.
    pub cached_entries: usize,
    pub elapsed_ms: u64,
}

/// Leak command handler.
pub struct LeakCommand<'a> {
    args: LeakArgs,
    config: LeakConfig,
    runtime: &'a Runtime,
}

impl<'a> LeakCommand<'a> {
    pub fn new(args: LeakArgs, config: LeakConfig, runtime: &'a Runtime) -> Self {
        Self {
            args,
            config,
            runtime,
        }
    }

    pub fn run(&self) -> Result<LeakReport> {
        let rounds = self.args.rounds.unwrap_or(self.config.rounds);
        let site = self.runtime.access_site(Access::GET_AND_ADD, None);
        // Outlives every round; its cell briefly references each victim.
        let survivors = Value::Ref(ObjectRef::from(ArrayObject::new(ElementType::Object, 1)));

        let start = Instant::now();
        let watches = (0..rounds)
            .map(|round| self.round(round, &site, &survivors))
            .collect::<Result<Vec<_>>>()?;

        let probe = self.runtime.reclaim_probe();
        let reclaimed_after = probe.reclaim_until(|| watches.iter().all(LoaderWatch::is_reclaimed));
        for watch in watches.iter().filter(|w| !w.is_reclaimed()) {
            tracing::warn!("loader {} still reachable", watch.name());
        }

        Ok(LeakReport {
            rounds,
            reclaimed_after,
            max_attempts: probe.attempts(),
            cached_entries: site.occupied(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Use one throwaway loader through `site` and return a watch on it.
    fn round(&self, round: u32, site: &AccessSite, survivors: &Value) -> Result<LoaderWatch> {
        let loader = self.runtime.new_loader(&format!("vhxt-leak-{}", round));
        let class = loader.define_class(
            ClassDesc::new("Victim")
                .field(FieldDesc::new_static("hits", "int"))
                .field(FieldDesc::instance("tag", "long")),
        )?;
        let lookup = class.lookup();
        let hits = lookup.find_static_var_handle(&class, "hits", ElementType::Int)?;
        let tag = lookup.find_var_handle(&class, "tag", ElementType::Long)?;
        let victim = Value::Ref(ObjectRef::from(Instance::new(&class)?));

        site.invoke(&hits, &[Value::Int(1)])?;
        site.invoke(&tag, &[victim.clone(), Value::Long(round as i64)])?;

        // Release through a reference cell so reclamation is deferred.
        let cells = lookup.array_element_var_handle(ElementType::Object);
        cells.set(&[survivors.clone(), Value::Int(0), victim])?;
        cells.set(&[survivors.clone(), Value::Int(0), Value::Null])?;

        tracing::debug!("round {} used loader {}", round, loader.name());
        Ok(LoaderWatch::new(&loader))
    }
}

/// Run the leak command and print its report.
pub fn run_leak(args: LeakArgs, config: LeakConfig, runtime: &Runtime) -> Result<()> {
    let report = LeakCommand::new(args, config, runtime).run()?;

    match report.reclaimed_after {
        Some(attempt) => {
            println!(
                "{} loaders reclaimed after {} of {} attempts ({} site entries cached, {} ms)",
                report.rounds, attempt, report.max_attempts, report.cached_entries, report.elapsed_ms
            );
            Ok(())
        }
        None => Err(VhxtError::CheckFailed(format!(
            "loaders still reachable after {} attempts",
            report.max_attempts
        ))),
    }
}
