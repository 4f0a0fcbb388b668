use std::process::Command;

fn git_output(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    // Check that static assets are present (required for embedding)
    // Only check in release mode since dev mode serves files directly
    #[cfg(not(debug_assertions))]
    {
        use std::path::Path;
        let static_dir = Path::new("static");
        if !static_dir.join("index.html").exists() {
            eprintln!("\n❌ ERROR: Static assets not found at 'static/'\n");
            eprintln!("The web UI files must be present before compiling in release mode.\n");
            std::process::exit(1);
        }
    }

    // Build metadata surfaced by /api/app-info
    println!("cargo:rustc-env=GIT_COMMIT={}", git_output(&["rev-parse", "HEAD"]));
    println!(
        "cargo:rustc-env=GIT_COMMIT_SHORT={}",
        git_output(&["rev-parse", "--short", "HEAD"])
    );
    println!(
        "cargo:rustc-env=GIT_BRANCH={}",
        git_output(&["rev-parse", "--abbrev-ref", "HEAD"])
    );
    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
    println!("cargo:rerun-if-changed=.git/HEAD");

    // Enables static linking of the vcruntime library on Windows builds
    static_vcruntime::metabuild();
}
