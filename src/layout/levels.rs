use std::collections::BTreeSet;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::{Result, invalid};
use crate::config::OptimizerConfig;

const SCORE_EPSILON: f64 = 1e-9;

/// Assigns integer levels (lanes) to connector lines so that lines which
/// cannot share a lane are stacked with the least total penalty.
///
/// `pair_score(i, j, level_i, level_j)` returns the penalty for edges `i` and
/// `j` sitting at the given levels, and must be symmetric. An infinite
/// penalty at `(1, 1)` marks the pair as crossing: the two edges must never
/// share a level.
pub struct LevelOptimizer<F> {
    pair_score: F,
    init_levels: Vec<u32>,
    min_levels: Option<Vec<u32>>,
    crosses: Vec<Vec<usize>>,
    edges_that_cross: Vec<usize>,
    components: Vec<Vec<usize>>,
    component_bounds: Vec<f64>,
    min_possible_penalty: f64,
    init_score: f64,
}

/// Per-edge ingredients of the lower bound.
struct BoundParts {
    /// Best achievable penalty of each crossing pair, charged to its lower edge.
    penalty: Vec<f64>,
    /// Levels an edge needs for a pairwise-perfect arrangement.
    levels: Vec<usize>,
}

impl BoundParts {
    fn over<'a>(&self, edges: impl IntoIterator<Item = &'a usize>) -> (f64, usize) {
        let mut penalty = 0.0;
        let mut levels = 1;
        for &edge in edges {
            penalty += self.penalty[edge];
            levels = levels.max(self.levels[edge]);
        }
        (penalty, levels)
    }
}

impl<F> LevelOptimizer<F>
where
    F: Fn(usize, usize, u32, u32) -> f64,
{
    pub fn new(pair_score: F, init_levels: Vec<u32>, min_levels: Option<Vec<u32>>) -> Result<Self> {
        if init_levels.contains(&0) {
            return Err(invalid("levels start at 1"));
        }
        if let Some(mins) = &min_levels {
            if mins.len() != init_levels.len() {
                return Err(invalid(format!(
                    "got {} minimum levels for {} edges",
                    mins.len(),
                    init_levels.len()
                )));
            }
            if mins.contains(&0) {
                return Err(invalid("minimum levels start at 1"));
            }
        }
        let highest_min = min_levels
            .as_ref()
            .and_then(|mins| mins.iter().copied().max())
            .unwrap_or(1);
        // a minimum of 1 everywhere is the same as no minimums at all
        let min_levels = min_levels.filter(|_| highest_min > 1);

        let mut optimizer = Self {
            pair_score,
            init_levels,
            min_levels,
            crosses: Vec::new(),
            edges_that_cross: Vec::new(),
            components: Vec::new(),
            component_bounds: Vec::new(),
            min_possible_penalty: 0.0,
            init_score: 0.0,
        };
        let parts = optimizer.compute_crosses()?;
        optimizer.components = optimizer.find_components();
        optimizer.component_bounds = optimizer
            .components
            .iter()
            .map(|component| {
                let (penalty, levels) = parts.over(component);
                penalty + optimizer.number_of_levels_penalty(levels)
            })
            .collect();
        let (penalty, levels) = parts.over(&optimizer.edges_that_cross);
        optimizer.min_possible_penalty = penalty + optimizer.number_of_levels_penalty(levels);
        optimizer.init_score = optimizer.score(&optimizer.init_levels);
        debug!(
            "level optimizer: {} edges, {} crossing in {} components, lower bound {}, initial score {}",
            optimizer.init_levels.len(),
            optimizer.edges_that_cross.len(),
            optimizer.components.len(),
            optimizer.min_possible_penalty,
            optimizer.init_score
        );
        Ok(optimizer)
    }

    pub fn num_edges(&self) -> usize {
        self.init_levels.len()
    }

    pub fn edges_that_cross(&self) -> &[usize] {
        &self.edges_that_cross
    }

    pub fn crosses(&self, edge: usize) -> &[usize] {
        self.crosses.get(edge).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Groups of edges connected through crossings. Edges in different
    /// groups never influence each other's pairwise penalty, so each group
    /// is optimized on its own.
    pub fn crossing_components(&self) -> &[Vec<usize>] {
        &self.components
    }

    /// Score no assignment can beat.
    pub fn min_possible_penalty(&self) -> f64 {
        self.min_possible_penalty
    }

    pub fn initial_score(&self) -> f64 {
        self.init_score
    }

    /// Penalty for using `used` distinct levels; always below 1 so it only
    /// breaks ties between equally good crossing arrangements.
    fn number_of_levels_penalty(&self, used: usize) -> f64 {
        let n = self.num_edges();
        if n == 0 {
            return 0.0;
        }
        used.saturating_sub(1) as f64 / n as f64
    }

    pub fn score(&self, levels: &[u32]) -> f64 {
        if levels.len() != self.num_edges() {
            return f64::INFINITY;
        }
        let penalty = self.pair_penalty(levels, &self.edges_that_cross);
        if !penalty.is_finite() {
            return penalty;
        }
        let used: BTreeSet<u32> = levels.iter().copied().collect();
        penalty + self.number_of_levels_penalty(used.len())
    }

    /// Score restricted to one crossing component: its pairs and the levels
    /// its edges use.
    fn component_score(&self, levels: &[u32], component: &[usize]) -> f64 {
        let penalty = self.pair_penalty(levels, component);
        if !penalty.is_finite() {
            return penalty;
        }
        let used: BTreeSet<u32> = component.iter().map(|&edge| levels[edge]).collect();
        penalty + self.number_of_levels_penalty(used.len())
    }

    fn pair_penalty(&self, levels: &[u32], edges: &[usize]) -> f64 {
        let mut penalty = 0.0;
        for &edge in edges {
            for &other in &self.crosses[edge] {
                if other > edge {
                    penalty += (self.pair_score)(edge, other, levels[edge], levels[other]);
                    if !penalty.is_finite() {
                        return penalty;
                    }
                }
            }
        }
        penalty
    }

    fn compute_crosses(&mut self) -> Result<BoundParts> {
        let n = self.num_edges();
        let mut crosses = vec![Vec::new(); n];
        let mut above = vec![false; n];
        let mut below = vec![false; n];
        let mut handled = vec![false; n];
        let mut edges_that_cross = Vec::new();
        let mut parts = BoundParts {
            penalty: vec![0.0; n],
            levels: vec![1; n],
        };

        for i in 0..n {
            for j in (i + 1)..n {
                let same = (self.pair_score)(i, j, 1, 1);
                if same.is_nan() {
                    return Err(invalid(format!("pair score for edges {i} and {j} is NaN")));
                }
                if same != f64::INFINITY {
                    continue;
                }
                crosses[i].push(j);
                crosses[j].push(i);
                for edge in [i, j] {
                    if !handled[edge] {
                        handled[edge] = true;
                        edges_that_cross.push(edge);
                    }
                }

                // crossing edges end up one above the other, so the better of
                // the two stackings is the best this pair can do
                let i_lower = (self.pair_score)(i, j, 1, 2);
                let i_upper = (self.pair_score)(i, j, 2, 1);
                if i_lower.is_nan() || i_upper.is_nan() {
                    return Err(invalid(format!("pair score for edges {i} and {j} is NaN")));
                }
                parts.penalty[i] += i_lower.min(i_upper);
                if i_lower < i_upper {
                    below[i] = true;
                    above[j] = true;
                }
                if i_lower > i_upper {
                    above[i] = true;
                    below[j] = true;
                }
            }
        }

        // any crossing needs two levels; an edge that wants to sit both above
        // and below its neighbors needs three for a pairwise-perfect arrangement
        for &edge in &edges_that_cross {
            parts.levels[edge] = 2.max(1 + above[edge] as usize + below[edge] as usize);
        }

        self.crosses = crosses;
        self.edges_that_cross = edges_that_cross;
        Ok(parts)
    }

    fn find_components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.num_edges()];
        let mut components = Vec::new();
        for &start in &self.edges_that_cross {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut stack = vec![start];
            let mut component = Vec::new();
            while let Some(edge) = stack.pop() {
                component.push(edge);
                for &next in &self.crosses[edge] {
                    if !seen[next] {
                        seen[next] = true;
                        stack.push(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    fn min_level(&self, edge: usize) -> u32 {
        self.min_levels.as_ref().map_or(1, |mins| mins[edge])
    }

    /// Level per edge with the lowest score found.
    ///
    /// Crossing components are optimized one after another: exhaustively when
    /// a component has at most `max_full_search_size` edges, by simulated
    /// annealing with `max_steps` steps otherwise.
    pub fn compute_vertical_positions(&self, max_full_search_size: usize, max_steps: usize, seed: u64) -> Vec<u32> {
        if self.init_score <= self.min_possible_penalty + SCORE_EPSILON {
            return self.init_levels.clone();
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut levels = self.init_levels.clone();
        for (component, &bound) in self.components.iter().zip(&self.component_bounds) {
            if self.component_score(&levels, component) <= bound + SCORE_EPSILON {
                continue;
            }
            let target = Target { edges: component, bound };
            levels = if component.len() <= max_full_search_size {
                debug!("exhaustive search over {} edges", component.len());
                self.exhaustive_search(&target, levels)
            } else {
                debug!("annealing over {} edges, {} steps", component.len(), max_steps);
                self.simulated_annealing(&target, levels, max_steps, &mut rng)
            };
        }
        levels
    }

    pub fn optimize(&self, config: &OptimizerConfig) -> Vec<u32> {
        self.compute_vertical_positions(config.max_full_search_size, config.max_steps, config.seed)
    }

    fn exhaustive_search(&self, target: &Target<'_>, start: Vec<u32>) -> Vec<u32> {
        let mut order = vec![usize::MAX; self.num_edges()];
        for (depth, &edge) in target.edges.iter().enumerate() {
            order[edge] = depth;
        }
        // room for every edge on its own level above the highest minimum
        let highest_min = target
            .edges
            .iter()
            .map(|&edge| self.min_level(edge))
            .max()
            .unwrap_or(1);
        let high = target.edges.len() as u32 + highest_min;

        let mut best = Best {
            score: self.component_score(&start, target.edges),
            values: start.clone(),
            checked: 0,
        };
        let mut values = start;
        self.search(target, &order, high, &mut values, 0, &mut best);
        debug!(
            "exhaustive search: best score {} after {} complete assignments",
            best.score, best.checked
        );
        best.values
    }

    fn search(&self, target: &Target<'_>, order: &[usize], high: u32, values: &mut [u32], depth: usize, best: &mut Best) {
        if depth == target.edges.len() {
            best.checked += 1;
            let score = self.component_score(values, target.edges);
            if score < best.score {
                trace!("exhaustive search: new best {values:?} ({score})");
                best.values = values.to_vec();
                best.score = score;
            }
            return;
        }

        let edge = target.edges[depth];
        for level in self.min_level(edge)..=high {
            // sharing a level with an already placed crossing edge is never valid
            let collides = self.crosses[edge]
                .iter()
                .any(|&other| order[other] < depth && values[other] == level);
            if collides {
                continue;
            }
            values[edge] = level;
            self.search(target, order, high, values, depth + 1, best);
            if target.reached(best.score) {
                break;
            }
        }
    }

    /// Gives each edge of the component its own level, which is always valid.
    fn basic_valid_assignment(&self, edges: &[usize], start: &[u32]) -> Vec<u32> {
        let mut levels = start.to_vec();
        let mut next = 1;
        for &edge in edges {
            next = next.max(self.min_level(edge));
            levels[edge] = next;
            next += 1;
        }
        levels
    }

    fn simulated_annealing(&self, target: &Target<'_>, start: Vec<u32>, max_steps: usize, rng: &mut StdRng) -> Vec<u32> {
        let start_score = self.component_score(&start, target.edges);
        let (mut best_state, mut best_score) = if start_score.is_finite() {
            (start, start_score)
        } else {
            let state = self.basic_valid_assignment(target.edges, &start);
            let score = self.component_score(&state, target.edges);
            (state, score)
        };
        let mut current_state = best_state.clone();
        let mut current_score = best_score;

        let restart_at = max_steps / 2;
        let mut steps_left = max_steps;
        loop {
            if target.reached(best_score) {
                break;
            }
            if steps_left == restart_at && current_score > best_score {
                trace!("annealing: restarting from best state at {steps_left} steps left");
                current_state = best_state.clone();
                current_score = best_score;
            }

            let candidate = self.neighbour(target.edges, &current_state, rng);
            let candidate_score = self.component_score(&candidate, target.edges);
            if accept(current_score, candidate_score, steps_left, rng) {
                current_state = candidate;
                current_score = candidate_score;
            }
            if current_score < best_score {
                trace!("annealing: new best {current_state:?} ({current_score}) at {steps_left} steps left");
                best_state = current_state.clone();
                best_score = current_score;
            }

            if steps_left == 0 {
                break;
            }
            steps_left -= 1;
        }
        debug!("annealing: best score {best_score}");
        best_state
    }

    /// Moves one random edge of the component to a different level, bumping
    /// past neighbors in the direction of change, then normalizes.
    fn neighbour(&self, edges: &[usize], current: &[u32], rng: &mut StdRng) -> Vec<u32> {
        let mut state = current.to_vec();
        let edge = edges[rng.gen_range(0..edges.len())];
        let old = state[edge];
        let max_used = edges.iter().map(|&e| current[e]).max().unwrap_or(1);

        let mut below_all = true;
        let mut above_all = true;
        for &other in &self.crosses[edge] {
            if state[other] > old {
                above_all = false;
            } else {
                below_all = false;
            }
        }

        // level 0 is out of range on purpose: it drops the edge under every
        // other one, and normalization lifts it back to the floor
        let mut level = if below_all {
            rng.gen_range(old + 1..=max_used + 1)
        } else if above_all {
            rng.gen_range(0..old)
        } else {
            let pick = rng.gen_range(0..=max_used);
            if pick >= old { pick + 1 } else { pick }
        };

        let rising = level > old;
        loop {
            let taken = self.crosses[edge].iter().any(|&other| state[other] == level);
            if !taken {
                break;
            }
            if rising {
                level += 1;
            } else {
                level = level.saturating_sub(1);
            }
        }
        state[edge] = level;

        self.normalize(&mut state, edges);
        state
    }

    /// Puts the component's edges back into canonical form: lowest level on
    /// the lowest minimum, no unused levels in between, minimum levels
    /// honored, and each edge directly on top of the highest crossing edge
    /// below it.
    fn normalize(&self, levels: &mut [u32], edges: &[usize]) {
        let Some(min_used) = edges.iter().map(|&edge| levels[edge]).min() else {
            return;
        };
        let floor = edges
            .iter()
            .map(|&edge| self.min_level(edge))
            .min()
            .unwrap_or(1);
        if min_used != floor {
            let delta = floor as i64 - min_used as i64;
            for &edge in edges {
                levels[edge] = (levels[edge] as i64 + delta).max(1) as u32;
            }
        }

        let used: Vec<u32> = edges
            .iter()
            .map(|&edge| levels[edge])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if let Some(&base) = used.first() {
            for &edge in edges {
                if let Ok(rank) = used.binary_search(&levels[edge]) {
                    levels[edge] = base + rank as u32;
                }
            }
        }

        let deficit = edges
            .iter()
            .map(|&edge| self.min_level(edge).saturating_sub(levels[edge]))
            .max()
            .unwrap_or(0);
        if deficit > 0 {
            for &edge in edges {
                levels[edge] += deficit;
            }
        }

        loop {
            let mut changed = false;
            for &edge in edges {
                let current = levels[edge];
                let highest_below = self.crosses[edge]
                    .iter()
                    .map(|&other| levels[other])
                    .filter(|&level| level < current)
                    .max()
                    .unwrap_or(0);
                let target = (highest_below + 1).max(self.min_level(edge));
                if target != current {
                    levels[edge] = target;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }
}

/// One crossing component under search, with the score it cannot beat.
struct Target<'a> {
    edges: &'a [usize],
    bound: f64,
}

impl Target<'_> {
    fn reached(&self, score: f64) -> bool {
        score <= self.bound + SCORE_EPSILON
    }
}

struct Best {
    values: Vec<u32>,
    score: f64,
    checked: usize,
}

/// Always takes an improvement; takes a worse or equal state with a
/// probability that shrinks as the step budget runs out, and never in the
/// last five steps.
fn accept(old: f64, new: f64, steps_left: usize, rng: &mut StdRng) -> bool {
    if new < old {
        return true;
    }
    if steps_left <= 5 {
        return false;
    }
    let temperature = (steps_left as f64 / 2.0).ln();
    let probability = (-(new - old) / temperature).exp();
    probability > rng.gen_range(0.0..1.0)
}
