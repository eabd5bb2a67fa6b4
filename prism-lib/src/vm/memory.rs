use crate::core::Value;
use crate::vm::{Error, Result, Stack, VmConfig};

/// Where to continue once the called chunk returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// chunk of the caller
    pub chunk: usize,
    /// ip of the caller, just after its CALL
    pub ip: usize,
    /// stack height when the callee was entered, its arguments already popped
    pub stack_base: usize,
}

/// Represents the 3 relevant memory areas of the VM: operand stack, variable slots
/// and call frames
#[derive(Debug, Clone)]
pub struct Memory {
    pub stack: Stack,
    pub slots: Vec<Value>,
    pub frames: Vec<Frame>,
    frames_max: usize,
}

impl Memory {
    pub fn new(slot_count: usize, config: &VmConfig) -> Self {
        Memory {
            stack: Stack::new(config.stack_max),
            slots: vec![Value::None; slot_count],
            frames: vec![],
            frames_max: config.frames_max,
        }
    }

    pub fn load(&self, slot: u16) -> Result<Value> {
        self.slots
            .get(slot as usize)
            .cloned()
            .ok_or(Error::BadSlot(slot))
    }

    pub fn store(&mut self, slot: u16, v: Value) -> Result<()> {
        let target = self
            .slots
            .get_mut(slot as usize)
            .ok_or(Error::BadSlot(slot))?;
        *target = v;
        Ok(())
    }

    pub fn push_frame(&mut self, frame: Frame) -> Result<()> {
        if self.frames.len() >= self.frames_max {
            return Err(Error::FrameOverflow);
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }
}
