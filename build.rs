fn main() {
    println!(
        "cargo:rustc-env=VULNBRIDGE_BUILD_TIME={}",
        chrono::Utc::now().to_rfc3339()
    );

    if let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        if output.status.success() {
            let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
            println!("cargo:rustc-env=VULNBRIDGE_GIT_HASH={hash}");
        }
    }
}
