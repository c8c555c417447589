//! Drift Configuration
//!
//! Defines runtime limits for the Drift virtual machine.
//! Configuration specifies constraints only; enforcement is handled by the VM.

/// VM Configuration
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum number of nested call frames, the top-level frame included
    pub max_call_depth: usize,

    /// Maximum number of values on a single frame's evaluation stack
    pub max_stack_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_depth: 1024,
            max_stack_size: 1024,
        }
    }
}

impl VmConfig {
    /// Create a new configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_stack_size(mut self, size: usize) -> Self {
        self.max_stack_size = size;
        self
    }
}
