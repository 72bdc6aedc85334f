use super::super::{Colony, ColonyError};
use crate::agent::{Agent, AgentFault};
use crate::nutrient::NutrientField;
use crate::rng::ColonyRng;
use tracing::warn;

/// One agent's turn: eat, then move and replicate unless still too light to move.
///
/// Agents at or above the division mass are immobile but still reach `replicate`.
fn advance_agent(
    agent: &mut Agent,
    field: &mut NutrientField,
    rng: &mut ColonyRng,
) -> Result<Option<Agent>, AgentFault> {
    agent.eat(field)?;
    if agent.mass() <= agent.kinetics().m_min() {
        return Ok(None);
    }
    let grid_size = field.size();
    agent.swim(grid_size, rng)?;
    agent.replicate(grid_size, rng)
}

impl Colony {
    /// Returns `(agents processed, divisions)`.
    ///
    /// Only agents alive when the pass starts take a turn; daughters wait in
    /// `pending` and join the population after the last turn. A fault halts the
    /// colony until `reset`.
    pub(in crate::colony) fn step_agent_phase(&mut self) -> Result<(usize, usize), ColonyError> {
        self.pending.clear();
        let live = self.agents.len();

        for (index, agent) in self.agents[..live].iter_mut().enumerate() {
            match advance_agent(agent, &mut self.field, &mut self.rng) {
                Ok(Some(daughter)) => self.pending.push(daughter),
                Ok(None) => {}
                Err(fault) => {
                    warn!(
                        iteration = self.iteration,
                        agent = index,
                        %fault,
                        "agent fault halted colony"
                    );
                    self.pending.clear();
                    self.fault = Some(fault);
                    self.paused = true;
                    return Err(fault.into());
                }
            }
        }

        let divisions = self.pending.len();
        self.agents.append(&mut self.pending);
        Ok((live, divisions))
    }
}
