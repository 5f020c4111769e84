//! External ISA analyzer for live-register reports and control-flow graphs.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::process::run_tool;
use super::{CfgGranularity, IsaAnalyzer, RegisterClass};
use crate::core::{PipelineError, PipelineResult};

/// Wraps an analyzer executable that reads one ISA file and writes one report.
#[derive(Debug, Clone)]
pub struct ExternalAnalyzer {
    program: PathBuf,
    print_commands: bool,
}

impl ExternalAnalyzer {
    pub fn new(program: impl Into<PathBuf>, print_commands: bool) -> Self {
        Self {
            program: program.into(),
            print_commands,
        }
    }

    fn run(&self, command: &str, isa: &Path, device: &str, output: &Path) -> PipelineResult<()> {
        let args: Vec<OsString> = vec![
            command.into(),
            "--arch".into(),
            device.into(),
            isa.into(),
            output.into(),
        ];
        let tool = self.program.display().to_string();
        run_tool(&self.program, &args, self.print_commands)?.into_result(&tool)?;
        if !output.exists() {
            return Err(PipelineError::MissingOutput {
                tool,
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

fn liveness_command(class: RegisterClass) -> &'static str {
    match class {
        RegisterClass::Vgpr => "analyse-liveness",
        RegisterClass::Sgpr => "analyse-liveness-sgpr",
    }
}

fn cfg_command(granularity: CfgGranularity) -> &'static str {
    match granularity {
        CfgGranularity::Block => "cfg",
        CfgGranularity::Instruction => "cfg-per-inst",
    }
}

impl IsaAnalyzer for ExternalAnalyzer {
    fn live_registers(&self, isa: &Path, device: &str, class: RegisterClass, output: &Path) -> PipelineResult<()> {
        self.run(liveness_command(class), isa, device, output)
    }

    fn control_flow_graph(
        &self,
        isa: &Path,
        device: &str,
        granularity: CfgGranularity,
        output: &Path,
    ) -> PipelineResult<()> {
        self.run(cfg_command(granularity), isa, device, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_per_mode() {
        assert_eq!(liveness_command(RegisterClass::Vgpr), "analyse-liveness");
        assert_eq!(liveness_command(RegisterClass::Sgpr), "analyse-liveness-sgpr");
        assert_eq!(cfg_command(CfgGranularity::Block), "cfg");
        assert_eq!(cfg_command(CfgGranularity::Instruction), "cfg-per-inst");
    }

    #[test]
    fn test_missing_analyzer_program() {
        let analyzer = ExternalAnalyzer::new("/nonexistent/isaforge-analyzer", false);
        let err = analyzer
            .live_registers(Path::new("k.isa"), "gfx900", RegisterClass::Vgpr, Path::new("k.txt"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ToolLaunch { .. }));
    }
}
