fn main() {
    // tauri_build emits these cfgs; declare them so headless builds that skip
    // it don't trip `check-cfg`.
    println!("cargo:rustc-check-cfg=cfg(desktop)");
    println!("cargo:rustc-check-cfg=cfg(mobile)");

    // The headless core builds without the `tauri` crate, and
    // `tauri_build::build()` requires it (it reads env vars the crate
    // exports, e.g. `DEP_TAURI_DEV`). Only run the build helpers when the
    // desktop runtime is compiled in.
    if std::env::var_os("CARGO_FEATURE_APP").is_some() {
        tauri_build::build()
    }
}
