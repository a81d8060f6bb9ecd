use super::{CheckArgs, load_config};
use anyhow::Context;
use nullability::config::OutputFormat;
use nullability::diag::Emitter;
use nullability::session::Session;

/// Returns `false` when any error was emitted.
pub fn run(args: CheckArgs) -> anyhow::Result<bool> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(format) = args.format {
        config.output.format = format.into();
    }
    let format = config.output.format;

    let session = Session::open(&args.module, config)
        .with_context(|| format!("failed to import module {}", args.module.display()))?;

    let import_diagnostics = session.import_diagnostics();
    if !import_diagnostics.is_empty() {
        let manifest = args.module.display().to_string();
        let rendered = Emitter::new(&manifest, "")
            .render(&import_diagnostics, format)
            .context("failed to render diagnostics")?;
        eprint!("{rendered}");
    }

    tracing::debug!("checking {} file(s) against '{}'", args.files.len(), session.module().name());
    let mut clean = true;
    for file in &args.files {
        let report = session
            .check_file(file)
            .with_context(|| format!("failed to check {}", file.display()))?;
        clean &= !report.has_errors();
        let rendered = report
            .render(format)
            .context("failed to render diagnostics")?;
        if format == OutputFormat::Json {
            println!("{rendered}");
        } else {
            print!("{rendered}");
        }
    }
    Ok(clean)
}
