//! CLI command implementations.

pub(crate) mod render;
pub(crate) mod stream;

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Args;
use tailmd_config::{CliSettings, Config};
use tailmd_diagrams::{KrokiRenderer, shared_cache};
use tailmd_renderer::{PlainHighlighter, RenderOptions, Renderer, SyntectHighlighter};

use crate::error::CliError;

pub(crate) use render::RenderArgs;
pub(crate) use stream::StreamArgs;

/// Options shared by every command.
#[derive(Args, Debug, Default)]
pub(crate) struct CommonArgs {
    /// Input file (default: stdin).
    input: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover tailmd.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable `$$` blocks and `$…$` inline math.
    #[arg(long)]
    no_math: bool,

    /// Disable syntax highlighting of fenced code.
    #[arg(long)]
    no_highlight: bool,

    /// Disable pipe tables.
    #[arg(long)]
    no_tables: bool,

    /// Emit HTML without running the sanitizer.
    #[arg(long)]
    no_sanitize: bool,

    /// CSS class prefix (overrides config).
    #[arg(long)]
    class_prefix: Option<String>,

    /// Kroki server URL for diagram rendering (overrides config).
    #[arg(long, env = "TAILMD_KROKI_URL")]
    kroki_url: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// CLI overrides; `cursor` is only meaningful for streaming commands.
    fn cli_settings(&self, cursor: Option<String>) -> CliSettings {
        CliSettings {
            math: disabled(self.no_math),
            highlight: disabled(self.no_highlight),
            tables: disabled(self.no_tables),
            sanitize: disabled(self.no_sanitize),
            cursor,
            class_prefix: self.class_prefix.clone(),
            kroki_url: self.kroki_url.clone(),
        }
    }

    /// Load config with this command's overrides applied.
    pub(crate) fn load_config(&self, cursor: Option<String>) -> Result<Config, CliError> {
        let settings = self.cli_settings(cursor);
        Ok(Config::load(self.config.as_deref(), Some(&settings))?)
    }

    /// Read the whole input file or stdin.
    pub(crate) fn read_input(&self) -> Result<String, CliError> {
        match &self.input {
            Some(path) => read_file(path),
            None => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                Ok(text)
            }
        }
    }
}

/// `--no-x` flags only override when present.
fn disabled(flag: bool) -> Option<bool> {
    flag.then_some(false)
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| {
        CliError::Validation(format!("cannot read {}: {e}", path.display()))
    })
}

/// Rendering flags from the loaded configuration.
pub(crate) fn render_options(config: &Config, streaming: bool) -> RenderOptions {
    let render = &config.render;
    RenderOptions {
        math: render.math,
        highlight: render.highlight,
        diagrams: config.diagrams_enabled(),
        tables: render.tables,
        gfm: render.gfm,
        superscript: render.superscript,
        mark: render.mark,
        streaming,
        sanitize: render.sanitize,
        cursor: config.stream.cursor.clone(),
        class_prefix: render.class_prefix.clone(),
    }
}

/// Build a renderer with the collaborators the configuration asks for.
pub(crate) fn build_renderer(config: &Config, streaming: bool) -> Renderer {
    let options = render_options(config, streaming);
    let highlight = options.highlight;
    let mut renderer = Renderer::new(options);

    renderer = if highlight {
        renderer.with_highlighter(SyntectHighlighter)
    } else {
        renderer.with_highlighter(PlainHighlighter)
    };

    let diagrams = &config.diagrams_resolved;
    if config.diagrams_enabled()
        && let Some(url) = &diagrams.kroki_url
    {
        tracing::info!(kroki_url = %url, "diagram rendering enabled");
        let kroki = KrokiRenderer::new(url.as_str(), diagrams.timeout)
            .with_cache(shared_cache(diagrams.cache_capacity));
        renderer = renderer.with_diagrams(kroki);
    }

    renderer
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_render_options_from_config() {
        let config = Config::from_toml(
            r#"
[render]
math = false
superscript = true
class_prefix = "x-"

[stream]
cursor = "|"
"#,
        )
        .unwrap();

        let options = render_options(&config, true);
        assert!(!options.math);
        assert!(options.superscript);
        assert!(options.streaming);
        assert!(!options.diagrams);
        assert_eq!(options.class_prefix, "x-");
        assert_eq!(options.cursor, "|");
    }

    #[test]
    fn test_cli_flags_override_config() {
        let file = config_file("[render]\nmath = true\ntables = true\n");
        let args = CommonArgs {
            config: Some(file.path().to_path_buf()),
            no_math: true,
            class_prefix: Some("p-".to_owned()),
            ..CommonArgs::default()
        };

        let config = args.load_config(Some("_".to_owned())).unwrap();
        assert!(!config.render.math);
        assert!(config.render.tables);
        assert_eq!(config.render.class_prefix, "p-");
        assert_eq!(config.stream.cursor, "_");
    }

    #[test]
    fn test_missing_config_is_error() {
        let args = CommonArgs {
            config: Some(PathBuf::from("/nonexistent/tailmd.toml")),
            ..CommonArgs::default()
        };
        assert!(matches!(
            args.load_config(None),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_build_renderer_without_diagrams() {
        let config = Config::from_toml("[render]\nhighlight = false\n").unwrap();
        let renderer = build_renderer(&config, false);
        assert_eq!(
            renderer.render("```mermaid\ngraph TD\n```"),
            "<pre class=\"md-code-block\"><code class=\"language-mermaid\">graph TD\n</code></pre>"
        );
    }

    #[test]
    fn test_read_input_from_file() {
        let file = config_file("# Hello\n");
        let args = CommonArgs {
            input: Some(file.path().to_path_buf()),
            ..CommonArgs::default()
        };
        assert_eq!(args.read_input().unwrap(), "# Hello\n");

        let missing = CommonArgs {
            input: Some(PathBuf::from("/nonexistent/input.md")),
            ..CommonArgs::default()
        };
        assert!(matches!(missing.read_input(), Err(CliError::Validation(_))));
    }
}
