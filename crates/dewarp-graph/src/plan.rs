use dewarp_core::EngineError;

use crate::{PassKind, PostPass};

/// Where a pass reads its input texture from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSlot {
    /// The frame sampler's working buffer.
    Frame,
    /// The intermediate written by the dewarp/perspective stage.
    Stage,
    PingPong(usize),
}

/// Where a pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSlot {
    Stage,
    PingPong(usize),
    /// Default framebuffer at viewport size.
    Screen,
}

impl TargetSlot {
    fn as_input(self) -> Option<InputSlot> {
        match self {
            TargetSlot::Stage => Some(InputSlot::Stage),
            TargetSlot::PingPong(i) => Some(InputSlot::PingPong(i)),
            TargetSlot::Screen => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassStep {
    pub pass: PassKind,
    pub input: InputSlot,
    pub target: TargetSlot,
}

/// Ordered pass list for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<PassStep>,
}

impl Plan {
    /// Compile the tick sequence: reprojection → post chain → present.
    ///
    /// Post passes alternate between two ping-pong targets so a pass never samples the
    /// texture it renders into.
    pub fn compile(dewarp_enabled: bool, chain: &[PostPass]) -> Result<Plan, EngineError> {
        let first = if dewarp_enabled {
            PassKind::Dewarp
        } else {
            PassKind::Perspective
        };

        let mut steps = Vec::with_capacity(chain.len() + 2);
        steps.push(PassStep {
            pass: first,
            input: InputSlot::Frame,
            target: TargetSlot::Stage,
        });

        let mut prev = TargetSlot::Stage;
        for (i, post) in chain.iter().enumerate() {
            let target = TargetSlot::PingPong(i % 2);
            steps.push(PassStep {
                pass: PassKind::Post(*post),
                input: prev.as_input().ok_or_else(|| EngineError::other("post pass after screen"))?,
                target,
            });
            prev = target;
        }

        steps.push(PassStep {
            pass: PassKind::Present,
            input: prev.as_input().ok_or_else(|| EngineError::other("present after screen"))?,
            target: TargetSlot::Screen,
        });

        let plan = Plan { steps };
        plan.validate()?;
        Ok(plan)
    }

    /// Number of ping-pong targets the plan writes.
    pub fn pingpong_targets(&self) -> usize {
        self.steps
            .iter()
            .filter_map(|s| match s.target {
                TargetSlot::PingPong(i) => Some(i + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Structural checks: single frame read at the head, exactly one screen write at the
    /// tail, and every step reads what the previous one wrote.
    pub fn validate(&self) -> Result<(), EngineError> {
        let (head, tail) = match (self.steps.first(), self.steps.last()) {
            (Some(h), Some(t)) => (h, t),
            _ => return Err(EngineError::other("plan: empty")),
        };
        if head.input != InputSlot::Frame {
            return Err(EngineError::other("plan: first pass must read the frame"));
        }
        if tail.target != TargetSlot::Screen || tail.pass != PassKind::Present {
            return Err(EngineError::other("plan: last pass must present to screen"));
        }
        for w in self.steps.windows(2) {
            if w[0].target.as_input() != Some(w[1].input) {
                return Err(EngineError::Other(format!(
                    "plan: {} reads {:?} but {} wrote {:?}",
                    w[1].pass.label(),
                    w[1].input,
                    w[0].pass.label(),
                    w[0].target
                )));
            }
            if let (InputSlot::PingPong(a), TargetSlot::PingPong(b)) = (w[1].input, w[1].target) {
                if a == b {
                    return Err(EngineError::other("plan: pass reads and writes the same target"));
                }
            }
        }
        Ok(())
    }
}
