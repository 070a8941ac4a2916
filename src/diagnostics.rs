use tracing::debug;

use crate::result::IsrenError;

/// Turns failures into the single message a user sees
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    debug: bool,
}

impl Diagnostics {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Short message by default, the full cause chain in debug mode
    pub fn render(&self, err: IsrenError) -> String {
        if self.debug {
            format!("{:?}", color_eyre::Report::new(err))
        } else {
            err.to_string()
        }
    }

    /// Report `err` on stderr and exit with a failure status
    pub fn fatal(&self, err: IsrenError) -> ! {
        debug!(kind = ?err.kind(), "Exiting after failure");
        eprintln!("{}", self.render(err));
        std::process::exit(1)
    }
}
