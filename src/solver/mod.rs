//! The two-phase strategy-iteration parity-game solver (spec.md §4.5),
//! grounded directly on `original_source`'s `PGSISolver`.

mod valuation;

pub use valuation::{DISTANCE_INFINITY, DISTANCE_MINUS_INFINITY};

use log::{debug, info, trace};

use crate::arena::{Arena, EdgeIndex, NodeIndex, Player, EDGE_NONE, NODE_BOTTOM, NODE_TOP};
use crate::dpa::{Color, Parity};
use valuation::{color_distance_delta, Distance};

/// Configuration for [`ParityGameSolver::solve`].
///
/// `verbosity` gates the `trace!` logging of intermediate distance vectors,
/// mirroring `original_source`'s `verbosity`-gated debug printouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolverOptions {
    pub verbosity: u8,
}

/// The solved strategy: for each system edge, whether it survives as part
/// of a winning (non-deterministic, for the system) strategy; for each
/// environment vertex, the single edge its optimal strategy picks.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub sys_successors: Vec<bool>,
    pub env_successors: Vec<EdgeIndex>,
}

/// The decided winner of every vertex, once solving has finished.
#[derive(Debug, Clone)]
pub struct WinningRegion {
    pub sys_winner: Vec<Option<Player>>,
    pub env_winner: Vec<Option<Player>>,
}

impl WinningRegion {
    fn new(n_sys_nodes: usize, n_env_nodes: usize) -> Self {
        Self {
            sys_winner: vec![None; n_sys_nodes],
            env_winner: vec![None; n_env_nodes],
        }
    }
}

/// Iteration counters reported alongside the solved game.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolvingStats {
    pub n_colors_reduced: Color,
    pub sys_phase_iterations: usize,
    pub env_phase_iterations: usize,
}

/// The outcome of solving a parity game.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// The winner of the arena's initial vertex.
    pub winner: Player,
    pub winning: WinningRegion,
    pub strategy: Strategy,
    pub stats: SolvingStats,
}

/// A pluggable parity-game solving algorithm.
pub trait ParityGameSolver {
    fn solve(&self, arena: &Arena, options: &SolverOptions) -> SolveResult;
}

fn reduce_colors(arena: &Arena) -> (Vec<Color>, Color) {
    let n_colors = arena.n_colors();
    let mut color_count = vec![0u32; n_colors as usize];
    for i in 0..arena.n_sys_edges() as EdgeIndex {
        let c = arena.sys_edge(i).color;
        color_count[c as usize] += 1;
    }

    let mut color_map = vec![0 as Color; n_colors as usize];
    let mut cur_color: Color = 0;
    for c in 0..n_colors {
        if color_count[c as usize] != 0 {
            if (c % 2) != (cur_color % 2) {
                cur_color += 1;
            }
            color_map[c as usize] = cur_color;
        }
    }
    (color_map, cur_color + 1)
}

/// The strategy-iteration solver from `original_source`'s `PGSISolver`.
pub struct SiSolver;

impl ParityGameSolver for SiSolver {
    fn solve(&self, arena: &Arena, options: &SolverOptions) -> SolveResult {
        let (color_map, n_colors) = reduce_colors(arena);
        debug!(
            "reduced {} colors to {} while preserving parity",
            arena.n_colors(),
            n_colors
        );

        let n_sys_nodes = arena.n_sys_nodes();
        let n_env_nodes = arena.n_env_nodes();

        let mut instance = Instance {
            arena,
            n_colors,
            color_map,
            verbosity: options.verbosity,
            sys_distances: vec![0; n_sys_nodes * n_colors as usize],
            env_distances: vec![0; n_env_nodes * n_colors as usize],
            winning: WinningRegion::new(n_sys_nodes, n_env_nodes),
            strategy: Strategy {
                sys_successors: vec![false; arena.n_sys_edges()],
                env_successors: vec![EDGE_NONE; n_env_nodes],
            },
            winner: None,
            stats: SolvingStats {
                n_colors_reduced: n_colors,
                sys_phase_iterations: 0,
                env_phase_iterations: 0,
            },
        };

        info!("starting strategy iteration for the system player");
        instance.strategy_iteration(Player::System);
        info!("starting strategy iteration for the environment player");
        instance.strategy_iteration(Player::Environment);

        let winner = instance.winner.unwrap_or_else(|| {
            // the initial vertex was never decided by either phase; this
            // only happens for a TOP/BOTTOM initial vertex, decided outright
            match arena.initial_node() {
                NODE_TOP => Player::Environment,
                NODE_BOTTOM => Player::System,
                _ => unreachable!("strategy iteration always decides every reachable vertex"),
            }
        });

        info!("finished solving parity game, winner: {:?}", winner);

        SolveResult {
            winner,
            winning: instance.winning,
            strategy: instance.strategy,
            stats: instance.stats,
        }
    }
}

struct Instance<'a> {
    arena: &'a Arena,
    n_colors: Color,
    color_map: Vec<Color>,
    verbosity: u8,
    sys_distances: Vec<Distance>,
    env_distances: Vec<Distance>,
    winning: WinningRegion,
    strategy: Strategy,
    winner: Option<Player>,
    stats: SolvingStats,
}

impl<'a> Instance<'a> {
    fn player_infinity(&self, player: Player) -> Distance {
        match player {
            Player::System => DISTANCE_INFINITY,
            Player::Environment => DISTANCE_MINUS_INFINITY,
        }
    }

    fn parity_is_odd(&self) -> bool {
        self.arena.parity() == Parity::Odd
    }

    fn strategy_iteration(&mut self, player: Player) {
        let mut change = true;
        while change && self.winner.is_none() {
            self.bellman_ford(player);
            trace!("executing strategy improvement");
            change = self.strategy_improvement(player);
            trace!("marking solved nodes");
            self.update_nodes(player);
            match player {
                Player::System => self.stats.sys_phase_iterations += 1,
                Player::Environment => self.stats.env_phase_iterations += 1,
            }
        }
    }

    fn bellman_ford(&mut self, player: Player) {
        trace!("executing bellman-ford algorithm");
        self.bellman_ford_init(player);
        let mut change = true;
        while change {
            match player {
                Player::System => {
                    self.bellman_ford_sys_iteration(player);
                    change = self.bellman_ford_env_iteration(player);
                }
                Player::Environment => {
                    self.bellman_ford_env_iteration(player);
                    change = self.bellman_ford_sys_iteration(player);
                }
            }
        }
    }

    fn bellman_ford_init(&mut self, player: Player) {
        let n_colors = self.n_colors as usize;
        let player_inf = self.player_infinity(player);

        for i in 0..self.arena.n_sys_nodes() {
            let decided = self.winning.sys_winner[i];
            let k = i * n_colors;
            if decided == Some(player)
                || (player == Player::Environment && decided.is_none())
            {
                self.sys_distances[k] = player_inf;
            } else {
                for l in k..k + n_colors {
                    self.sys_distances[l] = 0;
                }
            }
        }
        for i in 0..self.arena.n_env_nodes() {
            let decided = self.winning.env_winner[i];
            let k = i * n_colors;
            if decided == Some(player) || (player == Player::System && decided.is_none()) {
                self.env_distances[k] = player_inf;
            } else {
                for l in k..k + n_colors {
                    self.env_distances[l] = 0;
                }
            }
        }
    }

    fn bellman_ford_sys_iteration(&mut self, player: Player) -> bool {
        let n_colors = self.n_colors as usize;
        let n_env_nodes = self.arena.n_env_nodes() as NodeIndex;
        let mut change = false;

        for i in 0..self.arena.n_sys_nodes() {
            if self.winning.sys_winner[i].is_some() {
                continue;
            }
            let k = i * n_colors;
            if player == Player::System {
                for l in k..k + n_colors {
                    self.sys_distances[l] = 0;
                }
            }

            for j in self.arena.sys_succs_range(i as NodeIndex) {
                if player == Player::Environment || self.strategy.sys_successors[j as usize] {
                    let edge = self.arena.sys_edge(j);
                    let mut m = edge.successor as usize * n_colors;

                    if edge.successor == NODE_BOTTOM {
                        continue;
                    } else if edge.successor == NODE_TOP {
                        if self.sys_distances[k] != DISTANCE_INFINITY {
                            change = true;
                            self.sys_distances[k] = DISTANCE_INFINITY;
                        }
                        break;
                    } else if edge.successor < n_env_nodes {
                        if self.env_distances[m] == DISTANCE_INFINITY {
                            if self.sys_distances[k] != DISTANCE_INFINITY {
                                change = true;
                                self.sys_distances[k] = DISTANCE_INFINITY;
                            }
                            break;
                        } else if self.env_distances[m] == DISTANCE_MINUS_INFINITY {
                            continue;
                        }
                    }

                    let mut local_change = false;
                    let cur_color = self.color_map[edge.color as usize];
                    let delta = color_distance_delta(self.parity_is_odd(), cur_color);
                    self.sys_distances[k + cur_color as usize] -= delta;

                    for l in k..k + n_colors {
                        let d = self.sys_distances[l];
                        let d_succ = if edge.successor < n_env_nodes {
                            self.env_distances[m]
                        } else {
                            0
                        };
                        if local_change || d_succ > d {
                            self.sys_distances[l] = d_succ;
                            local_change = true;
                        } else if d_succ != d {
                            break;
                        }
                        m += 1;
                    }
                    self.sys_distances[k + cur_color as usize] += delta;

                    if local_change {
                        change = true;
                    }
                }
            }
        }
        change
    }

    fn bellman_ford_env_iteration(&mut self, player: Player) -> bool {
        let n_colors = self.n_colors as usize;
        let mut change = false;

        for i in 0..self.arena.n_env_nodes() {
            if self.winning.env_winner[i].is_some() {
                continue;
            }
            if player == Player::System {
                for j in self.arena.env_succs_range(i as NodeIndex) {
                    let successor = self.arena.env_edge(j);
                    let mut m = successor as usize * n_colors;

                    if self.sys_distances[m] < DISTANCE_INFINITY {
                        let mut local_change = false;
                        let k = i * n_colors;
                        for l in k..k + n_colors {
                            let d = self.env_distances[l];
                            let d_succ = self.sys_distances[m];
                            if local_change || d_succ < d {
                                self.env_distances[l] = d_succ;
                                local_change = true;
                            } else if d_succ != d {
                                break;
                            }
                            m += 1;
                        }
                        if local_change {
                            change = true;
                        }
                    }
                }
            } else {
                let j = self.strategy.env_successors[i];
                if j != EDGE_NONE {
                    let successor = self.arena.env_edge(j);
                    let mut m = successor as usize * n_colors;
                    let k = i * n_colors;
                    for l in k..k + n_colors {
                        self.env_distances[l] = self.sys_distances[m];
                        m += 1;
                    }
                }
            }
        }
        change
    }

    fn strategy_improvement(&mut self, player: Player) -> bool {
        match player {
            Player::System => self.strategy_improvement_sys(),
            Player::Environment => self.strategy_improvement_env(),
        }
    }

    fn strategy_improvement_sys(&mut self) -> bool {
        let n_colors = self.n_colors as usize;
        let n_env_nodes = self.arena.n_env_nodes() as NodeIndex;
        let mut change = false;

        for i in 0..self.arena.n_sys_nodes() {
            let k = i * n_colors;
            if self.winning.sys_winner[i].is_some() || self.sys_distances[k] >= DISTANCE_INFINITY {
                continue;
            }
            for j in self.arena.sys_succs_range(i as NodeIndex) {
                self.strategy.sys_successors[j as usize] = false;
                let edge = self.arena.sys_edge(j);

                if edge.successor == NODE_TOP {
                    self.strategy.sys_successors[j as usize] = true;
                    change = true;
                } else if edge.successor < n_env_nodes
                    && self.winning.env_winner[edge.successor as usize] != Some(Player::Environment)
                {
                    let mut improvement = true;
                    let mut m = edge.successor as usize * n_colors;

                    let cur_color = self.color_map[edge.color as usize];
                    let delta = color_distance_delta(self.parity_is_odd(), cur_color);
                    self.sys_distances[k + cur_color as usize] -= delta;

                    for l in k..k + n_colors {
                        let d = self.sys_distances[l];
                        let d_succ = self.env_distances[m];
                        if d_succ > d {
                            change = true;
                            break;
                        } else if d_succ != d {
                            improvement = false;
                            break;
                        }
                        m += 1;
                    }

                    self.sys_distances[k + cur_color as usize] += delta;

                    if improvement {
                        self.strategy.sys_successors[j as usize] = true;
                    }
                }
            }
        }
        change
    }

    fn strategy_improvement_env(&mut self) -> bool {
        let n_colors = self.n_colors as usize;
        let mut change = false;

        for i in 0..self.arena.n_env_nodes() {
            let k = i * n_colors;
            if self.winning.env_winner[i].is_some() || self.env_distances[k] <= DISTANCE_MINUS_INFINITY {
                continue;
            }
            for j in self.arena.env_succs_range(i as NodeIndex) {
                let successor = self.arena.env_edge(j);
                if self.winning.sys_winner[successor as usize] == Some(Player::System) {
                    continue;
                }
                let mut improvement = false;
                let m0 = successor as usize * n_colors;
                if self.sys_distances[m0] == DISTANCE_MINUS_INFINITY {
                    improvement = true;
                } else {
                    let mut m = m0;
                    for l in k..k + n_colors {
                        let d = self.env_distances[l];
                        let d_succ = self.sys_distances[m];
                        if d_succ < d {
                            improvement = true;
                            break;
                        } else if d_succ != d {
                            break;
                        }
                        m += 1;
                    }
                }

                if improvement {
                    change = true;
                    self.strategy.env_successors[i] = j;
                    break;
                }
            }
        }
        change
    }

    fn update_nodes(&mut self, player: Player) {
        let n_colors = self.n_colors as usize;
        let player_inf = self.player_infinity(player);

        for i in 0..self.arena.n_env_nodes() {
            if self.winning.env_winner[i].is_none() && self.env_distances[i * n_colors] == player_inf {
                self.winning.env_winner[i] = Some(player);
            }
        }

        for i in 0..self.arena.n_sys_nodes() {
            if self.winning.sys_winner[i].is_none() && self.sys_distances[i * n_colors] == player_inf {
                self.winning.sys_winner[i] = Some(player);
                if player == Player::System {
                    for j in self.arena.sys_succs_range(i as NodeIndex) {
                        if self.strategy.sys_successors[j as usize] {
                            let edge = self.arena.sys_edge(j);
                            if edge.successor < self.arena.n_env_nodes() as NodeIndex
                                && self.winning.env_winner[edge.successor as usize].is_none()
                                && self.env_distances[edge.successor as usize * n_colors] < DISTANCE_INFINITY
                            {
                                self.strategy.sys_successors[j as usize] = false;
                            }
                        }
                    }
                }
            }
        }

        self.winner = match self.arena.initial_node() {
            NODE_TOP => Some(Player::Environment),
            NODE_BOTTOM => Some(Player::System),
            initial => self.winning.env_winner[initial as usize],
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::SysEdge;
    use crate::dpa::Parity;

    /// A one-environment-vertex, one-system-vertex arena where the system
    /// has a direct edge to TOP: the system should win unconditionally.
    fn trivial_sys_win_arena() -> Arena {
        Arena {
            initial_node: 0,
            n_colors: 1,
            parity: Parity::Even,
            sys_succs_begin: vec![0, 1],
            sys_succs: vec![SysEdge {
                successor: NODE_TOP,
                color: 0,
            }],
            sys_output: vec![vec![0]],
            env_succs_begin: vec![0, 1],
            env_succs: vec![0],
            env_input: vec![vec![0]],
            complete: true,
        }
    }

    #[test]
    fn test_sys_wins_with_direct_top_edge() {
        let arena = trivial_sys_win_arena();
        let result = SiSolver.solve(&arena, &SolverOptions::default());
        assert_eq!(result.winner, Player::System);
        assert_eq!(result.winning.env_winner[0], Some(Player::System));
    }

    /// An environment vertex whose only system successor has a direct edge
    /// to BOTTOM: the environment should win unconditionally.
    fn trivial_env_win_arena() -> Arena {
        Arena {
            initial_node: 0,
            n_colors: 1,
            parity: Parity::Even,
            sys_succs_begin: vec![0, 1],
            sys_succs: vec![SysEdge {
                successor: NODE_BOTTOM,
                color: 0,
            }],
            sys_output: vec![vec![0]],
            env_succs_begin: vec![0, 1],
            env_succs: vec![0],
            env_input: vec![vec![0]],
            complete: true,
        }
    }

    #[test]
    fn test_env_wins_with_direct_bottom_edge() {
        let arena = trivial_env_win_arena();
        let result = SiSolver.solve(&arena, &SolverOptions::default());
        assert_eq!(result.winner, Player::Environment);
        assert_eq!(result.winning.sys_winner[0], Some(Player::Environment));
    }
}
