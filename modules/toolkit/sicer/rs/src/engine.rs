use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use eyre::{eyre, Result};
use itertools::Itertools;
use rayon::ThreadPool;
use thread_local::ThreadLocal;

use crate::island::Island;

use super::worker::Worker;
use super::workload::Workload;

#[derive(Default, Debug)]
pub struct Engine {
    workers: ThreadLocal<RefCell<Worker>>,
}

impl Engine {
    pub fn reset(&mut self) {
        // Soft-reset all workers
        for w in self.workers.iter_mut() {
            w.borrow_mut().reset()
        }
    }

    /// Process every chromosome of the workload in the pool. Returns the scored islands in
    /// chromosome order, or an error as soon as any chromosome fails.
    pub fn run(&mut self, pool: &mut ThreadPool, workload: &Workload) -> Result<Vec<Island>> {
        self.reset();

        let error_occured = AtomicBool::new(false);
        let errors = Mutex::new(Vec::new());

        let workers = &self.workers;
        pool.scope(|s| {
            for (chromind, (chrom, treatment, control)) in workload.chroms.iter().enumerate() {
                // Terminate the loop if an error has occurred in any of the threads
                if error_occured.load(Ordering::Relaxed) {
                    return;
                }

                let (error_occured, errors) = (&error_occured, &errors);
                s.spawn(move |_| {
                    if error_occured.load(Ordering::Relaxed) {
                        return;
                    }

                    let result = workers.get_or_default().borrow_mut().process(
                        chromind,
                        chrom,
                        treatment,
                        *control,
                        &workload.stages,
                    );
                    if let Err(err) = result {
                        log::error!("Island calling failed on {chrom}: {err:?}");
                        error_occured.store(true, Ordering::Relaxed);
                        if let Ok(mut errors) = errors.lock() {
                            errors.push((chrom.to_string(), err));
                        }
                    }
                });
            }
        });

        if error_occured.into_inner() {
            let mut errors = errors.into_inner()?;
            errors.sort_by(|a, b| a.0.cmp(&b.0));

            let failed = errors.iter().map(|x| &x.0).join(", ");
            let message = format!("Island calling failed on chromosome(s): {failed}");
            return match errors.into_iter().next() {
                Some((_, err)) => Err(err.wrap_err(message)),
                None => Err(eyre!(message)),
            };
        }

        let collapsed = Worker::collapse(
            workload.chroms.len(),
            self.workers.iter_mut().map(|x| x.get_mut()),
        );
        Ok(collapsed)
    }
}
