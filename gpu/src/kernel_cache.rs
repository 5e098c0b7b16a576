//! Kernel cache: avoids recompiling the same program multiple times.
//!
//! Keyed by the program's shader key (language, params, input shapes, body,
//! output shape), since equal keys always produce identical kernels. Each
//! entry is one compiled program instance and owns the uniform block its
//! setup hooks write into. The cache lives as long as its `GpuContext`.

use std::collections::HashMap;

use crate::backend::{NativeCompiledKernel, NativeContext};
use crate::error::Result;
use crate::host::HostProgram;
use crate::program::{shader_key, UniformBlock};

/// Compiled program instance with its uniform storage.
pub struct CachedKernel {
    pub compiled: NativeCompiledKernel,
    pub uniforms: UniformBlock,
}

#[derive(Default)]
pub struct KernelCache {
    entries: HashMap<String, CachedKernel>,
    hits: usize,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or compile the kernel for `program`.
    pub fn get_or_compile<P: HostProgram>(
        &mut self,
        ctx: &NativeContext,
        program: &P,
    ) -> Result<&mut CachedKernel> {
        let key = shader_key(program);

        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(e) => {
                self.hits += 1;
                log::debug!("kernel cache hit ({} backend)", ctx.name());
                Ok(e.into_mut())
            }
            std::collections::hash_map::Entry::Vacant(e) => {
                log::debug!(
                    "compiling {} program for {} backend",
                    program.lang().name(),
                    ctx.name()
                );
                let compiled = ctx.compile(program)?;
                Ok(e.insert(CachedKernel {
                    compiled,
                    uniforms: UniformBlock::new(program.uniforms()),
                }))
            }
        }
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cached kernels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Lookups served without compiling.
    pub fn hits(&self) -> usize {
        self.hits
    }
}
