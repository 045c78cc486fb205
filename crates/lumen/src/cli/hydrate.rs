//! The `lumen hydrate` command for rewriting document image references.

use anyhow::Context;
use clap::Args;
use lumen_core::{Config, Hydrator, Node, ResolvedPaths};
use std::path::{Path, PathBuf};

/// Arguments for the `hydrate` command.
#[derive(Args, Debug)]
pub struct HydrateArgs {
    /// mdast JSON tree to hydrate
    #[arg(required = true)]
    pub tree: PathBuf,

    /// Directory relative references resolve against (defaults to the tree's directory)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the hydrate command.
pub fn execute(args: HydrateArgs, config: &Config, paths: &ResolvedPaths) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.tree)
        .with_context(|| format!("Failed to read {}", args.tree.display()))?;
    let tree: Node = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a document tree", args.tree.display()))?;

    let doc_dir = args
        .dir
        .clone()
        .unwrap_or_else(|| document_dir(&args.tree, &paths.project_root));

    let hydrator = Hydrator::from_disk(config, paths);
    let (hydrated, report) = hydrator.hydrate(&tree, &doc_dir);
    tracing::info!(
        "Hydrated {} reference(s), {} unresolved, {} remote",
        report.hydrated,
        report.unresolved,
        report.remote
    );

    let json = serde_json::to_string_pretty(&hydrated)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Absolute directory containing the tree file.
fn document_dir(tree: &Path, project_root: &Path) -> PathBuf {
    let absolute = if tree.is_absolute() {
        tree.to_path_buf()
    } else {
        project_root.join(tree)
    };
    absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_root.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_dir() {
        let root = Path::new("/site");
        assert_eq!(
            document_dir(Path::new("docs/page.json"), root),
            PathBuf::from("/site/docs")
        );
        assert_eq!(
            document_dir(Path::new("/elsewhere/page.json"), root),
            PathBuf::from("/elsewhere")
        );
    }

    #[test]
    fn test_execute_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let paths = config.resolve(dir.path());
        let tree = dir.path().join("page.json");
        std::fs::write(
            &tree,
            r#"{"type":"root","children":[{"type":"image","url":"https://x/a.png"}]}"#,
        )
        .unwrap();
        let output = dir.path().join("out.json");

        execute(
            HydrateArgs {
                tree,
                dir: None,
                output: Some(output.clone()),
            },
            &config,
            &paths,
        )
        .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(written["children"][0]["url"], "https://x/a.png");
    }
}
