// This module is the build-and-analyze orchestrator. Commander::run takes one
// CompileRequest through the whole pipeline: resolve the requested devices into
// canonical targets, then for each target (strictly in sequence) compile the sources,
// optionally dump LLVM IR, relay compiler warnings, disassemble the binary, split the
// disassembly into per-kernel fragments, reduce each fragment to its real code size and
// write the per-kernel ISA files. Every outcome is recorded in the run's OutputStore;
// each target first records into its own local store which is merged afterwards, so
// targets never see each other's partial state. When the loop is done the
// post-processing passes run in a fixed order, gated by "every target succeeded or more
// than one device was requested", and finally every temporary file recorded in the
// store is removed. A CancelToken lets a caller stop the run between targets.

//! Compile orchestration and post-processing.

pub mod compile;
pub mod disassemble;
pub mod post;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::{CompileRequest, OutputRecord, OutputStore, PipelineError, PipelineResult, RecordKey, Workspace};
use crate::target::{CompilerNameTable, TargetResolver};
use crate::toolchain::Toolchain;

pub use post::{delete_temp_files, PassContext, PostPass};

/// Shared flag that stops a run before its next target starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one run.
#[derive(Debug)]
pub struct RunReport {
    /// Every resolved target compiled (and disassembled, when needed).
    pub all_succeeded: bool,
    /// More than one device was requested.
    pub multi_device: bool,
    pub store: OutputStore,
}

impl RunReport {
    /// A single-device run whose target failed.
    ///
    /// Failures inside a multi-device batch are reported per target only.
    pub fn batch_failed(&self) -> bool {
        !self.all_succeeded && !self.multi_device
    }
}

/// Everything one target needs from the run.
pub(crate) struct RunContext<'r> {
    pub toolchain: &'r Toolchain<'r>,
    pub compiler_names: &'r CompilerNameTable,
    pub workspace: &'r Workspace,
    pub request: &'r CompileRequest,
}

/// Drives a [`CompileRequest`] through the toolchain.
pub struct Commander<'a> {
    toolchain: Toolchain<'a>,
    resolver: TargetResolver,
    compiler_names: CompilerNameTable,
    workspace: Workspace,
    cancel: CancelToken,
}

impl<'a> Commander<'a> {
    pub fn new(toolchain: Toolchain<'a>, resolver: TargetResolver) -> Self {
        Self {
            toolchain,
            resolver,
            compiler_names: CompilerNameTable::builtin(),
            workspace: Workspace::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_workspace(mut self, workspace: Workspace) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn with_compiler_names(mut self, compiler_names: CompilerNameTable) -> Self {
        self.compiler_names = compiler_names;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for cancelling this commander's runs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Compile, analyze and clean up.
    ///
    /// Fails only when the request has no sources or no device resolves;
    /// everything else is recorded per target in the returned store.
    pub fn run(&self, request: &CompileRequest) -> PipelineResult<RunReport> {
        if request.sources.is_empty() {
            return Err(PipelineError::NoInputFile);
        }

        let mut store = OutputStore::new();
        let all_succeeded = self.compile(request, &mut store)?;

        if all_succeeded || request.is_multi_device() {
            let ctx = PassContext {
                toolchain: &self.toolchain,
                request,
                store: &store,
            };
            post::run_post_passes(&ctx);
        } else {
            log::debug!("Compilation failed, skipping post-processing");
        }

        delete_temp_files(&mut store);
        log::debug!("{}", store.stats());

        Ok(RunReport {
            all_succeeded,
            multi_device: request.is_multi_device(),
            store,
        })
    }

    /// The per-target compile loop. Returns whether every target succeeded.
    pub fn compile(&self, request: &CompileRequest, store: &mut OutputStore) -> PipelineResult<bool> {
        let resolution = self.resolver.resolve(&request.devices)?;
        let mut all_succeeded = true;

        for device in &resolution.rejected {
            store.insert(RecordKey::device(device), OutputRecord::failed());
            store.stats_mut().record_target_failed();
            all_succeeded = false;
        }

        let ctx = RunContext {
            toolchain: &self.toolchain,
            compiler_names: &self.compiler_names,
            workspace: &self.workspace,
            request,
        };
        for device in &resolution.targets {
            if self.cancel.is_cancelled() {
                log::warn!("Cancelled, {} is not compiled", device);
                all_succeeded = false;
                break;
            }
            let mut local = OutputStore::new();
            let succeeded = compile::compile_target(&ctx, device, &mut local);
            store.merge(local);
            all_succeeded &= succeeded;
        }

        Ok(all_succeeded)
    }
}
