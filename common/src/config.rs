//! Configuration types for runtime and output settings

/// Runtime configuration for tokio and thread pools
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    /// Number of tokio worker threads (0 = number of CPU cores)
    pub max_workers: usize,
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress error output
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
    /// Print summary statistics at the end
    pub print_summary: bool,
}

impl OutputConfig {
    /// Default log filter derived from the quiet/verbose flags.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "off";
        }
        match self.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_beats_verbose() {
        let output = OutputConfig {
            quiet: true,
            verbose: 3,
            print_summary: false,
        };
        assert_eq!(output.log_level(), "off");
    }

    #[test]
    fn verbosity_levels() {
        let mut output = OutputConfig::default();
        assert_eq!(output.log_level(), "error");
        output.verbose = 1;
        assert_eq!(output.log_level(), "info");
        output.verbose = 2;
        assert_eq!(output.log_level(), "debug");
        output.verbose = 9;
        assert_eq!(output.log_level(), "trace");
    }
}
