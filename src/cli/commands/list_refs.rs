//! List-refs command implementation.
//!
//! The `overcast list-refs` command prints the images, flavors and
//! networks a stack refers to but does not create. With `--tmpl` it
//! prints a mapping file instead, ready to be filled in:
//!
//! ```text
//! overcast list-refs --tmpl stack.yaml > .overcast.mappings.yaml
//! ```

use std::io::Write;

use crate::cli::args::ListRefsArgs;
use crate::config::{load_stack, render_template};
use crate::error::{OvercastError, Result};
use crate::stack::{format_refs, resolve};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The list-refs command implementation.
pub struct ListRefsCommand {
    args: ListRefsArgs,
}

impl ListRefsCommand {
    /// Create a new list-refs command.
    pub fn new(args: ListRefsArgs) -> Self {
        Self { args }
    }

    /// Text the command prints for the configured stack.
    pub fn render(&self) -> Result<String> {
        let stack = load_stack(&self.args.stack)?;
        let refs = resolve(&stack);
        tracing::debug!(
            "{} image(s), {} flavor(s), {} network(s) referenced",
            refs.images.len(),
            refs.flavors.len(),
            refs.networks.len()
        );

        Ok(if self.args.tmpl {
            render_template(&refs)
        } else {
            format_refs(&refs)
        })
    }
}

impl Command for ListRefsCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let output = match self.render() {
            Ok(o) => o,
            Err(OvercastError::ConfigNotFound { path }) => {
                ui.error(&format!("Stack file not found: {}", path.display()));
                return Ok(CommandResult::failure(2));
            }
            Err(e) => return Err(e),
        };

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(output.as_bytes())?;
        stdout.flush()?;
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn stack_file(yaml: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stack.yaml");
        fs::write(&path, yaml).unwrap();
        (temp, path)
    }

    const STACK: &str = r#"
networks:
  lan:
    cidr: 10.0.0.0/24
nodes:
  web:
    image: trusty
    flavor: m1.small
    disk: 10
    nics:
      - network: lan
      - network: public
"#;

    #[test]
    fn renders_human_listing() {
        let (_temp, path) = stack_file(STACK);
        let cmd = ListRefsCommand::new(ListRefsArgs {
            tmpl: false,
            stack: path,
        });

        let out = cmd.render().unwrap();
        assert!(out.contains("Images:\n  trusty\n"));
        assert!(out.contains("Networks:\n  public\n"));
        assert!(!out.contains("lan"));
    }

    #[test]
    fn renders_template() {
        let (_temp, path) = stack_file(STACK);
        let cmd = ListRefsCommand::new(ListRefsArgs { tmpl: true, stack: path });

        let out = cmd.render().unwrap();
        assert!(out.contains("flavors:\n  \"m1.small\":"));
        assert!(out.contains("networks:\n  \"public\":"));
    }

    #[test]
    fn missing_stack_fails_with_code_2() {
        let temp = TempDir::new().unwrap();
        let cmd = ListRefsCommand::new(ListRefsArgs {
            tmpl: false,
            stack: temp.path().join("missing.yaml"),
        });
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();
        assert_eq!(result.exit_code, 2);
        assert!(ui.has_error("Stack file not found"));
    }
}
