//! The evaluator: memo table, scheduling, restarts, and error handling.
//!
//! Evaluation proceeds in rounds. Every node that is ready to run is
//! computed in parallel on a rayon pool against a frozen view of the memo
//! table; outcomes are applied afterwards on the calling thread. A node that
//! reports missing dependencies is parked until all of them are committed,
//! then run again from scratch.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use rayon::prelude::*;

use crate::engine::{Entry, Env, NodeError, NodeFunction};

/// How to react to node failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Keep evaluating independent nodes after an error and report every
    /// error at the end. When false, evaluation stops scheduling new work at
    /// the first error and only propagates that error to the requested roots.
    pub keep_going: bool,
}

impl EvaluationOptions {
    pub fn keep_going() -> Self {
        EvaluationOptions { keep_going: true }
    }

    pub fn fail_fast() -> Self {
        EvaluationOptions { keep_going: false }
    }
}

/// Counters for one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    /// Scheduling rounds
    pub rounds: usize,
    /// Node computations that completed with a value or an error
    pub computed: usize,
    /// Node computations that stopped on a missing dependency
    pub restarts: usize,
}

/// Outcome of evaluating a set of root keys.
pub struct EvaluationResult<F: NodeFunction> {
    values: HashMap<F::Key, F::Value>,
    errors: Vec<(F::Key, NodeError<F::Error>)>,
    aborted: Vec<F::Key>,
    stats: EvaluationStats,
}

impl<F: NodeFunction> EvaluationResult<F> {
    /// Value of a root, if it was computed successfully.
    pub fn get(&self, key: &F::Key) -> Option<&F::Value> {
        self.values.get(key)
    }

    /// Error of a root, if it failed.
    pub fn error(&self, key: &F::Key) -> Option<&NodeError<F::Error>> {
        self.errors.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    /// Errors of all failed roots, in root order.
    pub fn errors(&self) -> impl Iterator<Item = (&F::Key, &NodeError<F::Error>)> {
        self.errors.iter().map(|(k, e)| (k, e))
    }

    /// Roots left unevaluated because a fail-fast evaluation stopped early.
    pub fn aborted(&self) -> &[F::Key] {
        &self.aborted
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty() || !self.aborted.is_empty()
    }

    pub fn stats(&self) -> EvaluationStats {
        self.stats
    }
}

enum Outcome<F: NodeFunction> {
    Done {
        value: F::Value,
        deps: Vec<F::Key>,
    },
    Failed {
        error: NodeError<F::Error>,
        deps: Vec<F::Key>,
    },
    Pending {
        deps: Vec<F::Key>,
        missing: Vec<F::Key>,
    },
}

/// Scheduling state of a single `evaluate` call.
struct Run<F: NodeFunction> {
    keep_going: bool,
    /// Set after the first error of a fail-fast evaluation
    bubbling: bool,
    ready: Vec<F::Key>,
    queued: HashSet<F::Key>,
    scheduled: HashSet<F::Key>,
    /// Parked node -> dependencies it still waits for
    waiting: HashMap<F::Key, HashSet<F::Key>>,
    /// Dependency -> parked nodes waiting for it
    parents: HashMap<F::Key, HashSet<F::Key>>,
    bubble_ready: Vec<F::Key>,
    /// Errors propagated while bubbling; never memoized
    bubbled: HashMap<F::Key, NodeError<F::Error>>,
    stats: EvaluationStats,
}

impl<F: NodeFunction> Run<F> {
    fn new(keep_going: bool) -> Self {
        Run {
            keep_going,
            bubbling: false,
            ready: Vec::new(),
            queued: HashSet::new(),
            scheduled: HashSet::new(),
            waiting: HashMap::new(),
            parents: HashMap::new(),
            bubble_ready: Vec::new(),
            bubbled: HashMap::new(),
            stats: EvaluationStats::default(),
        }
    }

    fn schedule(&mut self, key: F::Key) {
        if self.scheduled.insert(key.clone()) {
            self.push_ready(key);
        }
    }

    fn push_ready(&mut self, key: F::Key) {
        if self.queued.insert(key.clone()) {
            self.ready.push(key);
        }
    }

    fn take_ready(&mut self) -> Vec<F::Key> {
        self.queued.clear();
        std::mem::take(&mut self.ready)
    }

    fn has_work(&self) -> bool {
        !self.ready.is_empty() || !self.waiting.is_empty()
    }

    /// Once bubbling, only nodes that depend on a failed node keep running.
    fn restrict_to_bubbling(&mut self) {
        self.ready.clear();
        self.queued.clear();
        for key in std::mem::take(&mut self.bubble_ready) {
            if !self.bubbled.contains_key(&key) {
                self.push_ready(key);
            }
        }
    }
}

/// Evaluates nodes of a [`NodeFunction`] and memoizes their outcomes.
pub struct Evaluator<F: NodeFunction> {
    function: F,
    memo: RwLock<HashMap<F::Key, Entry<F>>>,
    /// Dependency -> nodes that read it
    rdeps: Mutex<HashMap<F::Key, HashSet<F::Key>>>,
    pool: Option<rayon::ThreadPool>,
}

impl<F: NodeFunction> Evaluator<F> {
    /// Create an evaluator that runs on the global rayon pool.
    pub fn new(function: F) -> Self {
        Evaluator {
            function,
            memo: RwLock::new(HashMap::new()),
            rdeps: Mutex::new(HashMap::new()),
            pool: None,
        }
    }

    /// Run node computations on a dedicated pool of `jobs` threads.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => self.pool = Some(pool),
            Err(e) => {
                tracing::warn!("failed to create a pool of {} threads, using the global pool: {}", jobs, e);
            }
        }
        self
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    /// Memoized value of `key`, without computing anything.
    pub fn get(&self, key: &F::Key) -> Option<F::Value> {
        match self.read_memo().get(key) {
            Some(Entry::Done(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Number of memoized nodes.
    pub fn len(&self) -> usize {
        self.read_memo().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_memo().is_empty()
    }

    /// Compute `roots` and everything they depend on.
    pub fn evaluate(&self, roots: &[F::Key], options: EvaluationOptions) -> EvaluationResult<F> {
        self.drop_transient_errors();

        let mut run = Run::new(options.keep_going);
        {
            let memo = self.read_memo();
            for root in roots {
                if !memo.contains_key(root) {
                    run.schedule(root.clone());
                }
            }
        }

        while run.has_work() {
            if run.ready.is_empty() {
                if run.bubbling {
                    break;
                }
                if !self.fail_cycles(&mut run) {
                    tracing::warn!(
                        "evaluation stalled with {} node(s) waiting",
                        run.waiting.len()
                    );
                    break;
                }
                if run.bubbling {
                    run.restrict_to_bubbling();
                }
                continue;
            }

            let bubbling_batch = run.bubbling;
            let batch = run.take_ready();
            run.stats.rounds += 1;
            tracing::debug!("evaluation round {}: {} node(s)", run.stats.rounds, batch.len());

            let outcomes = self.compute_batch(batch, &run.bubbled);
            for (key, outcome) in outcomes {
                self.apply(&mut run, key, outcome, bubbling_batch);
            }

            if run.bubbling {
                run.restrict_to_bubbling();
            }
        }

        self.collect(roots, run)
    }

    /// Drop `keys` and every node that transitively read them.
    ///
    /// Returns the number of nodes removed from the memo table.
    pub fn invalidate(&self, keys: impl IntoIterator<Item = F::Key>) -> usize {
        let mut rdeps = self.rdeps.lock().unwrap_or_else(|e| e.into_inner());
        let mut memo = self.write_memo();

        let mut stack: Vec<F::Key> = keys.into_iter().collect();
        let mut seen = HashSet::new();
        let mut removed = 0;

        while let Some(key) = stack.pop() {
            if !seen.insert(key.clone()) {
                continue;
            }
            if memo.remove(&key).is_some() {
                removed += 1;
                tracing::debug!("invalidated {}", key);
            }
            if let Some(parents) = rdeps.remove(&key) {
                stack.extend(parents);
            }
        }

        removed
    }

    /// Run `f` against the memo table as if it were a node, returning its
    /// result and the keys it found missing.
    #[cfg(test)]
    pub(crate) fn probe<T>(&self, f: impl FnOnce(&mut Env<'_, F>) -> T) -> (T, Vec<F::Key>) {
        let memo = self.read_memo();
        let bubbled = HashMap::new();
        let mut env = Env::new(&memo, &bubbled);
        let result = f(&mut env);
        let (_, missing) = env.into_parts();
        (result, missing)
    }

    fn drop_transient_errors(&self) {
        let transient: Vec<F::Key> = self
            .read_memo()
            .iter()
            .filter_map(|(key, entry)| match entry {
                Entry::Failed(error) if error.is_transient() => Some(key.clone()),
                _ => None,
            })
            .collect();

        if !transient.is_empty() {
            tracing::debug!("retrying {} transient failure(s)", transient.len());
            self.invalidate(transient);
        }
    }

    fn compute_batch(
        &self,
        batch: Vec<F::Key>,
        bubbled: &HashMap<F::Key, NodeError<F::Error>>,
    ) -> Vec<(F::Key, Outcome<F>)> {
        let guard = self.read_memo();
        let memo: &HashMap<F::Key, Entry<F>> = &guard;

        let work = || {
            batch
                .into_par_iter()
                .map(|key| {
                    let mut env = Env::new(memo, bubbled);
                    let result = self.function.compute(&key, &mut env);
                    let (deps, missing) = env.into_parts();
                    let outcome = match result {
                        Ok(Some(value)) => Outcome::Done { value, deps },
                        Err(error) => Outcome::Failed { error, deps },
                        Ok(None) if missing.is_empty() => {
                            tracing::error!(
                                "node {} returned no value without a missing dependency",
                                key
                            );
                            let error = self.function.incomplete_error(&key);
                            Outcome::Failed {
                                error: NodeError::persistent(error),
                                deps,
                            }
                        }
                        Ok(None) => Outcome::Pending { deps, missing },
                    };
                    (key, outcome)
                })
                .collect::<Vec<_>>()
        };

        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }

    fn apply(&self, run: &mut Run<F>, key: F::Key, outcome: Outcome<F>, bubbling_batch: bool) {
        match outcome {
            Outcome::Done { value, deps } => {
                run.stats.computed += 1;
                let failed = self.commit(&key, Entry::Done(value), &deps);
                if !bubbling_batch {
                    self.complete(run, &key, failed);
                }
            }
            Outcome::Failed { error, deps } => {
                run.stats.computed += 1;
                tracing::debug!("{} failed: {}", key, error);
                if bubbling_batch {
                    run.bubbled.insert(key.clone(), error);
                } else {
                    self.commit(&key, Entry::Failed(error), &deps);
                    if !run.keep_going {
                        run.bubbling = true;
                    }
                }
                self.complete(run, &key, true);
            }
            Outcome::Pending { deps, missing } => {
                run.stats.restarts += 1;
                if bubbling_batch {
                    // Restarted only because a dependency failed; adopt its error
                    if let Some(error) = self.first_failed(&deps, &run.bubbled) {
                        run.bubbled.insert(key.clone(), error);
                        self.complete(run, &key, true);
                    }
                    return;
                }
                self.park(run, key, missing);
            }
        }
    }

    /// Park `key` until every key in `missing` is committed.
    fn park(&self, run: &mut Run<F>, key: F::Key, missing: Vec<F::Key>) {
        let mut waits = HashSet::new();
        let mut saw_failure = false;

        for dep in missing {
            let committed = self.read_memo().get(&dep).map(Entry::is_failed);
            match committed {
                Some(failed) => saw_failure |= failed,
                None => {
                    run.parents
                        .entry(dep.clone())
                        .or_default()
                        .insert(key.clone());
                    waits.insert(dep.clone());
                    run.schedule(dep);
                }
            }
        }

        tracing::debug!("{} restarts after {} missing dependencies", key, waits.len());

        if saw_failure && run.bubbling {
            run.bubble_ready.push(key);
        } else if waits.is_empty() {
            run.push_ready(key);
        } else {
            run.waiting.insert(key, waits);
        }
    }

    /// Release the nodes parked on `key`.
    fn complete(&self, run: &mut Run<F>, key: &F::Key, failed: bool) {
        let Some(parents) = run.parents.remove(key) else {
            return;
        };

        for parent in parents {
            let Some(waits) = run.waiting.get_mut(&parent) else {
                continue;
            };
            waits.remove(key);
            let released = waits.is_empty();

            if failed && run.bubbling {
                run.waiting.remove(&parent);
                run.bubble_ready.push(parent);
            } else if released {
                run.waiting.remove(&parent);
                run.push_ready(parent);
            }
        }
    }

    /// Record an outcome. The first committed outcome of a key wins.
    ///
    /// Returns whether the winning outcome is a failure.
    fn commit(&self, key: &F::Key, entry: Entry<F>, deps: &[F::Key]) -> bool {
        {
            let mut rdeps = self.rdeps.lock().unwrap_or_else(|e| e.into_inner());
            for dep in deps {
                rdeps.entry(dep.clone()).or_default().insert(key.clone());
            }
        }

        let mut memo = self.write_memo();
        memo.entry(key.clone()).or_insert(entry).is_failed()
    }

    fn first_failed(
        &self,
        deps: &[F::Key],
        bubbled: &HashMap<F::Key, NodeError<F::Error>>,
    ) -> Option<NodeError<F::Error>> {
        let memo = self.read_memo();
        deps.iter().find_map(|dep| {
            if let Some(error) = bubbled.get(dep) {
                return Some(error.clone());
            }
            match memo.get(dep) {
                Some(Entry::Failed(error)) => Some(error.clone()),
                _ => None,
            }
        })
    }

    /// Fail every parked node that is part of a dependency cycle.
    ///
    /// Returns false if no cycle was found.
    fn fail_cycles(&self, run: &mut Run<F>) -> bool {
        let keys: Vec<F::Key> = run.waiting.keys().cloned().collect();
        let index: HashMap<&F::Key, usize> = keys.iter().enumerate().map(|(i, k)| (k, i)).collect();

        let mut graph = DiGraph::<usize, ()>::new();
        let nodes: Vec<_> = (0..keys.len()).map(|i| graph.add_node(i)).collect();
        for (i, key) in keys.iter().enumerate() {
            for dep in &run.waiting[key] {
                if let Some(&j) = index.get(dep) {
                    graph.add_edge(nodes[i], nodes[j], ());
                }
            }
        }

        let cycles: Vec<Vec<F::Key>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| scc.iter().map(|n| keys[graph[*n]].clone()).collect())
            .collect();

        for cycle in &cycles {
            tracing::debug!("dependency cycle among {} node(s)", cycle.len());
            for member in cycle {
                run.waiting.remove(member);
                let error = NodeError::persistent(self.function.cycle_error(member, cycle));
                self.commit(member, Entry::Failed(error), &[]);
            }
            if !run.keep_going {
                run.bubbling = true;
            }
            for member in cycle {
                self.complete(run, member, true);
            }
        }

        !cycles.is_empty()
    }

    fn collect(&self, roots: &[F::Key], run: Run<F>) -> EvaluationResult<F> {
        let memo = self.read_memo();
        let mut values = HashMap::new();
        let mut errors = Vec::new();
        let mut aborted = Vec::new();

        for root in roots {
            if let Some(error) = run.bubbled.get(root) {
                errors.push((root.clone(), error.clone()));
                continue;
            }
            match memo.get(root) {
                Some(Entry::Done(value)) => {
                    values.insert(root.clone(), value.clone());
                }
                Some(Entry::Failed(error)) => errors.push((root.clone(), error.clone())),
                None => aborted.push(root.clone()),
            }
        }

        tracing::debug!(
            "evaluated {} root(s): {} computed, {} restarts, {} rounds",
            roots.len(),
            run.stats.computed,
            run.stats.restarts,
            run.stats.rounds
        );

        EvaluationResult {
            values,
            errors,
            aborted,
            stats: run.stats,
        }
    }

    fn read_memo(&self) -> RwLockReadGuard<'_, HashMap<F::Key, Entry<F>>> {
        self.memo.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_memo(&self) -> RwLockWriteGuard<'_, HashMap<F::Key, Entry<F>>> {
        self.memo.write().unwrap_or_else(|e| e.into_inner())
    }
}
