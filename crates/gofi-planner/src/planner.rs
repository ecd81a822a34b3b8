//! The MCTS planning call.
//!
//! # One planning call
//!
//! ```text
//! predictions ─▶ SimulatedAgent motions (fixed for the call)
//! root        ─▶ feasible ego candidates
//! repeat until n_simulations done, rollout_batch leaves at a time:
//!   ① select   — UCB1 down the tree, virtual visit on the path
//!   ② expand   — first untried feasible action of the leaf
//!   ③ rollout  — uniformly random feasible actions to max_depth
//!                (in parallel with the `parallel` feature)
//!   ④ backup   — total reward, in simulation-index order
//! pick the root child with the highest mean reward
//! ```
//!
//! A rollout's randomness comes only from `RolloutRng::new(seed, frame,
//! index)`, so the result is the same however the batch is scheduled.

use tracing::debug;

use gofi_core::{AgentId, AgentState, BoundingBox, Frame, NodeId, RolloutRng};
use gofi_map::{DijkstraLaneRouter, LaneRouter, RoadMap};
use gofi_motion::{CostEvaluator, LaneDirection, MacroAction, MacroActionLibrary, Trajectory};
use gofi_recognition::{AgentPrediction, PresenceBelief};

use crate::{
    ChildStats, MctsConfig, PlanDiagnostics, PlanError, PlanResult, RolloutRecord, RolloutWorld,
    SearchTree, SimulatedAgent, SimulatedAgentRecord, StepEvent, StoreResults,
};

/// Input of one planning call.
#[derive(Clone, Debug)]
pub struct PlanRequest<'p> {
    pub agent:       AgentId,
    pub frame:       Frame,
    pub state:       AgentState,
    pub length:      f64,
    pub width:       f64,
    pub goal:        BoundingBox,
    pub predictions: &'p [AgentPrediction],
    /// Joint presence of hypothesised agents.  Without it, occluded agents
    /// with existence below 1 are drawn independently.
    pub presence:    Option<&'p PresenceBelief>,
}

/// Result of one planning call.
#[derive(Clone, Debug)]
pub struct PlanOutcome {
    pub action:      MacroAction,
    /// Ego motion of `action` from the request state.
    pub trajectory:  Trajectory,
    pub mean_reward: f64,
    pub visits:      u32,
    /// Non-ego agents every rollout considered, and how they moved.
    pub simulated:   Vec<SimulatedAgentRecord>,
    pub diagnostics: Option<PlanDiagnostics>,
}

/// Where a rollout starts: a snapshot of the leaf it extends.
#[derive(Clone, Debug)]
struct Leaf {
    index:       usize,
    node:        NodeId,
    state:       AgentState,
    time:        f64,
    depth:       usize,
    path_reward: f64,
    event:       Option<StepEvent>,
}

#[derive(Clone, Debug)]
struct RolloutOutcome {
    reward:  f64,
    actions: Vec<MacroAction>,
    event:   Option<StepEvent>,
    /// Agents the rollout drew absent.
    absent:  Vec<AgentId>,
}

/// Occlusion-aware MCTS over ego macro-actions.  Holds no state between
/// calls.
pub struct MctsPlanner<'a, R: LaneRouter = DijkstraLaneRouter> {
    pub map:       &'a RoadMap,
    pub library:   &'a MacroActionLibrary<R>,
    pub evaluator: &'a CostEvaluator,
    pub config:    &'a MctsConfig,
    pub seed:      u64,
}

impl<R: LaneRouter> MctsPlanner<'_, R> {
    /// Ego candidates in expansion order.
    pub fn candidates(&self, goal: &BoundingBox) -> Vec<MacroAction> {
        vec![
            MacroAction::Continue,
            MacroAction::ChangeLane { direction: LaneDirection::Left },
            MacroAction::ChangeLane { direction: LaneDirection::Right },
            MacroAction::Exit { turn_target: goal.center },
            MacroAction::Stop { duration: self.config.t_update },
        ]
    }

    pub fn plan(&self, req: &PlanRequest<'_>) -> PlanResult<PlanOutcome> {
        if !self.map.contains(req.goal.center) {
            return Err(PlanError::UnreachableGoal { agent: req.agent });
        }
        let agents: Vec<SimulatedAgent> = req
            .predictions
            .iter()
            .filter(|p| p.agent != req.agent)
            .map(|p| SimulatedAgent::from_prediction(self.map, self.library, p))
            .collect();
        let presence = match req.presence {
            Some(p) => p.clone(),
            None => {
                let uncertain: Vec<(AgentId, f64)> =
                    agents.iter().filter(|a| a.existence < 1.0).map(|a| (a.agent, a.existence)).collect();
                PresenceBelief::new(&uncertain)
            }
        };
        let world = RolloutWorld {
            map:        self.map,
            library:    self.library,
            evaluator:  self.evaluator,
            reward:     &self.config.reward,
            goal:       req.goal,
            ego_length: req.length,
            ego_width:  req.width,
            agents,
            presence,
            candidates: self.candidates(&req.goal),
        };
        let simulated: Vec<SimulatedAgentRecord> = world
            .agents
            .iter()
            .map(|a| SimulatedAgentRecord { agent: a.agent, mode: a.mode })
            .collect();

        let root_actions = world.feasible(&req.state);
        if root_actions.is_empty() {
            return Err(PlanError::NoViableAction { agent: req.agent });
        }
        let mut tree = SearchTree::new(req.state, root_actions);
        let depth = self.config.depth();
        let batch = self.config.rollout_batch.max(1);
        let keep_rollouts = self.config.store_results == StoreResults::All;
        let mut records = Vec::new();

        let mut done = 0;
        while done < self.config.n_simulations {
            let n = batch.min(self.config.n_simulations - done);
            let leaves: Vec<Leaf> = (0..n)
                .map(|k| {
                    let id = self.select_and_expand(&mut tree, &world, depth);
                    tree.add_virtual_visit(id);
                    let node = tree.node(id);
                    Leaf {
                        index:       done + k,
                        node:        id,
                        state:       node.state,
                        time:        node.time,
                        depth:       node.depth,
                        path_reward: node.path_reward,
                        event:       node.event,
                    }
                })
                .collect();

            let outcomes = self.run_batch(&world, &leaves, req.frame, depth);

            for (leaf, outcome) in leaves.iter().zip(outcomes) {
                tree.backup(leaf.node, outcome.reward);
                debug!(
                    agent = %req.agent,
                    frame = %req.frame,
                    rollout = leaf.index,
                    reward = outcome.reward,
                    event = ?outcome.event,
                    absent = ?outcome.absent,
                    "rollout"
                );
                if keep_rollouts {
                    let mut actions = tree.actions_to(leaf.node);
                    actions.extend(outcome.actions);
                    records.push(RolloutRecord {
                        index: leaf.index,
                        actions,
                        reward: outcome.reward,
                        event: outcome.event,
                        agents: simulated.clone(),
                        absent: outcome.absent,
                    });
                }
            }
            done += n;
        }

        let best = tree.best_root_child().ok_or(PlanError::NoViableAction { agent: req.agent })?;
        let node = tree.node(best);
        let action = node.action.clone().ok_or(PlanError::NoViableAction { agent: req.agent })?;
        debug!(
            agent = %req.agent,
            frame = %req.frame,
            action = %action,
            mean_reward = node.mean_reward,
            tree_size = tree.len(),
            "search complete"
        );

        let diagnostics = (self.config.store_results != StoreResults::None).then(|| PlanDiagnostics {
            agent:     req.agent,
            frame:     req.frame,
            tree_size: tree.len(),
            root:      tree
                .root()
                .children
                .iter()
                .map(|&c| {
                    let n = tree.node(c);
                    ChildStats {
                        action:      n.action.clone().unwrap_or(MacroAction::Continue),
                        visits:      n.visits,
                        mean_reward: n.mean_reward,
                    }
                })
                .collect(),
            rollouts:  records,
        });

        Ok(PlanOutcome {
            action,
            trajectory: node.trajectory.clone(),
            mean_reward: node.mean_reward,
            visits: node.visits,
            simulated,
            diagnostics,
        })
    }

    // ── Tree policy ───────────────────────────────────────────────────────

    fn select_and_expand(&self, tree: &mut SearchTree, world: &RolloutWorld<'_, R>, depth: usize) -> NodeId {
        let mut id = SearchTree::ROOT;
        loop {
            let node = tree.node(id);
            if node.is_terminal() || node.depth >= depth {
                return id;
            }
            if !node.untried.is_empty() {
                return self.expand(tree, world, id, depth);
            }
            match tree.select_child(id, self.config.exploration) {
                Some(child) => id = child,
                None => return id,
            }
        }
    }

    fn expand(&self, tree: &mut SearchTree, world: &RolloutWorld<'_, R>, id: NodeId, depth: usize) -> NodeId {
        let (action, trajectory) = tree.node_mut(id).untried.remove(0);
        let parent = tree.node(id);
        let mut step = world.simulate(trajectory, parent.time);
        let child_depth = parent.depth + 1;

        let mut untried = Vec::new();
        if step.event.is_none() && child_depth < depth {
            let end = step.trajectory.final_state().unwrap_or(parent.state);
            untried = world.feasible(&end);
            if untried.is_empty() {
                step.event = Some(StepEvent::DeadEnd);
                step.reward += world.reward.dead_end;
            }
        }
        tree.add_child(id, action, step.trajectory, step.reward, step.event, untried)
    }

    // ── Default policy ────────────────────────────────────────────────────

    fn run_batch(&self, world: &RolloutWorld<'_, R>, leaves: &[Leaf], frame: Frame, depth: usize) -> Vec<RolloutOutcome> {
        #[cfg(not(feature = "parallel"))]
        {
            leaves.iter().map(|leaf| self.rollout(world, leaf, frame, depth)).collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            leaves.par_iter().map(|leaf| self.rollout(world, leaf, frame, depth)).collect()
        }
    }

    fn rollout(&self, world: &RolloutWorld<'_, R>, leaf: &Leaf, frame: Frame, depth: usize) -> RolloutOutcome {
        let mut rng = RolloutRng::new(self.seed, frame, leaf.index as u32);
        let present = world.sample_presence(&mut rng);
        let absent = world
            .agents
            .iter()
            .zip(&present)
            .filter(|(_, p)| !**p)
            .map(|(a, _)| a.agent)
            .collect();
        let mut out = RolloutOutcome { reward: leaf.path_reward, actions: Vec::new(), event: leaf.event, absent };
        if leaf.event.is_some() {
            return out;
        }
        let (mut state, mut time) = (leaf.state, leaf.time);
        for _ in leaf.depth..depth {
            let mut feasible = world.feasible(&state);
            if feasible.is_empty() {
                out.reward += world.reward.dead_end;
                out.event = Some(StepEvent::DeadEnd);
                break;
            }
            let (action, trajectory) = feasible.swap_remove(rng.gen_range(0..feasible.len()));
            let step = world.simulate_sampled(trajectory, time, &present);
            out.reward += step.reward;
            out.actions.push(action);
            time += step.trajectory.duration();
            if let Some(end) = step.trajectory.final_state() {
                state = end;
            }
            if step.event.is_some() {
                out.event = step.event;
                break;
            }
        }
        out
    }
}
