//! Stress command implementation.
//!
//! Drives two handles on different locations through one shared dispatch
//! site from many threads, and keeps a weak-CAS counter on a third. A value
//! of the wrong type returned through the site, or a final count that does
//! not match the updates made, means a cached entry was applied to the
//! wrong handle.

use std::thread;
use std::time::Instant;

use vhx_rt::class::FieldDesc;
use vhx_rt::object::{Instance, ObjectRef};
use vhx_rt::site::SiteStats;
use vhx_rt::util::RetryPolicy;
use vhx_rt::{Access, AccessSite, ClassDesc, ElementType, Runtime, Value, VarHandle};

use crate::config::StressConfig;
use crate::error::{Result, VhxtError};

/// Iterations between two weak-CAS increments in each worker.
const WEAK_CAS_STRIDE: u32 = 16;

/// Arguments for the stress command.
#[derive(Debug, Clone, Default)]
pub struct StressArgs {
    /// Worker threads (default: from config).
    pub threads: Option<u32>,
    /// Accesses per worker (default: from config).
    pub iterations: Option<u32>,
}

/// Outcome of one counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterReport {
    pub name: &'static str,
    pub expected: i64,
    pub actual: i64,
}

/// Summary of a stress run.
#[derive(Debug, Clone)]
pub struct StressReport {
    pub threads: u32,
    pub iterations: u32,
    pub counters: Vec<CounterReport>,
    /// Values of the wrong type returned through the site.
    pub cross_observations: u64,
    pub site: SiteStats,
    pub elapsed_ms: u64,
}

impl CounterReport {
    /// Report for an `int` counter; `updates` unit increments wrap like the field does.
    fn int(name: &'static str, updates: i64, actual: i64) -> Self {
        Self {
            name,
            expected: i64::from(updates as i32),
            actual,
        }
    }

    /// Report for a `long` counter.
    fn long(name: &'static str, updates: i64, actual: i64) -> Self {
        Self {
            name,
            expected: updates,
            actual,
        }
    }
}

impl StressReport {
    pub fn passed(&self) -> bool {
        self.cross_observations == 0 && self.counters.iter().all(|c| c.expected == c.actual)
    }
}

/// Per-worker tally of updates made.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    a: i64,
    b: i64,
    weak: i64,
    cross: u64,
}

impl std::ops::Add for Tally {
    type Output = Tally;

    fn add(self, other: Tally) -> Tally {
        Tally {
            a: self.a + other.a,
            b: self.b + other.b,
            weak: self.weak + other.weak,
            cross: self.cross + other.cross,
        }
    }
}

/// Handles and receiver shared by the workers.
struct Targets {
    a: VarHandle,
    b: VarHandle,
    weak: VarHandle,
    receiver: Value,
}

/// Stress command handler.
pub struct StressCommand<'a> {
    args: StressArgs,
    config: StressConfig,
    runtime: &'a Runtime,
}

impl<'a> StressCommand<'a> {
    pub fn new(args: StressArgs, config: StressConfig, runtime: &'a Runtime) -> Self {
        Self {
            args,
            config,
            runtime,
        }
    }

    fn threads(&self) -> u32 {
        self.args.threads.unwrap_or(self.config.threads)
    }

    fn iterations(&self) -> u32 {
        self.args.iterations.unwrap_or(self.config.iterations)
    }

    /// Run the workers and compare final counts with the updates made.
    pub fn run(&self) -> Result<StressReport> {
        let threads = self.threads();
        let iterations = self.iterations();
        if threads == 0 {
            return Err(VhxtError::Validation("--threads must be at least 1".to_string()));
        }

        let loader = self.runtime.new_loader("vhxt-stress");
        let class = loader.define_class(
            ClassDesc::new("Stress")
                .field(FieldDesc::new_static("a", "int"))
                .field(FieldDesc::instance("b", "long"))
                .field(FieldDesc::new_static("weak", "int")),
        )?;
        let lookup = class.lookup();
        let targets = Targets {
            a: lookup.find_static_var_handle(&class, "a", ElementType::Int)?,
            b: lookup.find_var_handle(&class, "b", ElementType::Long)?,
            weak: lookup.find_static_var_handle(&class, "weak", ElementType::Int)?,
            receiver: Value::Ref(ObjectRef::from(Instance::new(&class)?)),
        };
        let site = self.runtime.access_site(Access::GET_AND_ADD, None);
        let policy = self.runtime.retry_policy();

        tracing::info!("stressing {} threads x {} iterations", threads, iterations);
        let start = Instant::now();
        let tally = thread::scope(|scope| {
            let workers: Vec<_> = (0..threads)
                .map(|t| {
                    let (targets, site, policy) = (&targets, &site, &policy);
                    scope.spawn(move || run_worker(t, iterations, targets, site, policy))
                })
                .collect();
            workers.into_iter().try_fold(Tally::default(), |sum, worker| {
                let tally = worker
                    .join()
                    .map_err(|_| VhxtError::CheckFailed("worker thread panicked".to_string()))??;
                Ok::<_, VhxtError>(sum + tally)
            })
        })?;
        let elapsed = start.elapsed();

        let read = |vh: &VarHandle, coords: &[Value]| -> Result<i64> {
            let value = vh.get_volatile(coords)?;
            value
                .as_i64()
                .or_else(|| value.as_i32().map(i64::from))
                .ok_or_else(|| VhxtError::CheckFailed(format!("unexpected value {:?}", value)))
        };
        let counters = vec![
            CounterReport::int("Stress.a", tally.a, read(&targets.a, &[])?),
            CounterReport::long(
                "Stress.b",
                tally.b,
                read(&targets.b, &[targets.receiver.clone()])?,
            ),
            CounterReport::int("Stress.weak", tally.weak, read(&targets.weak, &[])?),
        ];

        Ok(StressReport {
            threads,
            iterations,
            counters,
            cross_observations: tally.cross,
            site: site.stats(),
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }
}

fn run_worker(
    t: u32,
    iterations: u32,
    targets: &Targets,
    site: &AccessSite,
    policy: &RetryPolicy,
) -> Result<Tally> {
    let mut tally = Tally::default();
    let b_args = [targets.receiver.clone(), Value::Long(1)];

    for i in 0..iterations {
        if (t + i) % 2 == 0 {
            if !matches!(site.invoke(&targets.a, &[Value::Int(1)])?, Value::Int(_)) {
                tally.cross += 1;
            }
            tally.a += 1;
        } else {
            if !matches!(site.invoke(&targets.b, &b_args)?, Value::Long(_)) {
                tally.cross += 1;
            }
            tally.b += 1;
        }

        if i % WEAK_CAS_STRIDE == 0 {
            loop {
                let current = targets.weak.get_volatile(&[])?;
                let next = current
                    .as_i32()
                    .map(|n| Value::Int(n.wrapping_add(1)))
                    .ok_or_else(|| VhxtError::CheckFailed(format!("unexpected value {:?}", current)))?;
                if targets.weak.weak_compare_and_set_retrying(
                    Access::WEAK_COMPARE_AND_SET,
                    &[current, next],
                    policy,
                )? {
                    break;
                }
            }
            tally.weak += 1;
        }
    }
    Ok(tally)
}

/// Run the stress command and print its report.
pub fn run_stress(args: StressArgs, config: StressConfig, runtime: &Runtime) -> Result<()> {
    let report = StressCommand::new(args, config, runtime).run()?;

    println!(
        "{} threads x {} iterations in {} ms",
        report.threads, report.iterations, report.elapsed_ms
    );
    for counter in &report.counters {
        println!(
            "  {:<12} expected {:>10} actual {:>10}",
            counter.name, counter.expected, counter.actual
        );
    }
    println!(
        "  site: {} hits, {} misses, {} evictions ({:.1}% hit rate)",
        report.site.hits,
        report.site.misses,
        report.site.evictions,
        report.site.hit_rate() * 100.0
    );

    if report.passed() {
        println!("ok");
        Ok(())
    } else {
        Err(VhxtError::CheckFailed(format!(
            "{} cross-handle observations, counters {:?}",
            report.cross_observations, report.counters
        )))
    }
}
