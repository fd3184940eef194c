use std::path::Path;
use std::process::Command;

const VERSION_VAR: &str = "BUDGETWATCH_BUILD_SHA";

/// Revision of the checkout, with `-dirty` when the tree has local edits.
fn describe(workspace: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let rev = String::from_utf8(out.stdout).ok()?;
    let rev = rev.trim();
    (!rev.is_empty()).then(|| rev.to_owned())
}

fn main() {
    println!("cargo:rerun-if-env-changed={VERSION_VAR}");

    // Source tarballs have no .git; packagers can pass the revision in.
    let rev = std::env::var(VERSION_VAR).ok().filter(|v| !v.is_empty()).or_else(|| {
        let manifest = std::env::var_os("CARGO_MANIFEST_DIR")?;
        let workspace = Path::new(&manifest).parent()?.to_path_buf();
        println!("cargo:rerun-if-changed={}", workspace.join(".git/HEAD").display());
        describe(&workspace)
    });

    println!("cargo:rustc-env={VERSION_VAR}={}", rev.as_deref().unwrap_or("unknown"));
}
