use super::{DumpArgs, load_config};
use anyhow::Context;
use nullability::project::ImportedModule;

pub fn run(args: DumpArgs) -> anyhow::Result<bool> {
    let config = load_config(args.config.as_deref())?;
    let module = ImportedModule::load(&args.module, &config.resolve)
        .with_context(|| format!("failed to import module {}", args.module.display()))?;

    print!("{}", module.render_interface());
    for issue in module.issues() {
        eprintln!("warning: {issue}");
    }
    Ok(true)
}
