//! Integration tests for packstore

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn packstore() -> Command {
        cargo_bin_cmd!("packstore")
    }

    #[test]
    fn help_displays() {
        packstore()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Runtime package cache composer"));
    }

    #[test]
    fn version_displays() {
        packstore()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("packstore"));
    }

    #[test]
    fn compose_requires_closure() {
        packstore()
            .args(["compose", "--platform", "win7-x64", "--output", "o"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--closure"));
    }

    #[test]
    fn compose_missing_closure_file_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        packstore()
            .args([
                "compose",
                "--closure",
                "does-not-exist.json",
                "--platform",
                "win7-x64",
                "--output",
            ])
            .arg(temp.path().join("out"))
            .arg("--staging")
            .arg(temp.path().join("w"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("closure file"));
    }

    #[test]
    fn platforms_lists_chains() {
        packstore()
            .arg("platforms")
            .assert()
            .success()
            .stdout(predicate::str::contains("win7-x64"))
            .stdout(predicate::str::contains("Package family pins"));
    }

    #[test]
    fn platforms_single_chain() {
        packstore()
            .args(["platforms", "--platform", "win7-x64"])
            .assert()
            .success()
            .stdout(predicate::str::contains("win-x64"));
    }

    #[test]
    fn platforms_unknown_platform_fails() {
        packstore()
            .args(["platforms", "--platform", "freebsd-x64"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no configured fallback chain"));
    }

    #[test]
    fn completions_generate() {
        packstore()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("packstore"));
    }
}

mod compose_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn packstore() -> Command {
        cargo_bin_cmd!("packstore")
    }

    /// On-disk fixture: extracted packages plus closure/baseline files
    struct Fixture {
        temp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                temp: TempDir::new().unwrap(),
            }
        }

        fn path(&self) -> &Path {
            self.temp.path()
        }

        /// Lay one package on disk and return its closure record
        fn package(
            &self,
            id: &str,
            version: &str,
            assets: &[(&str, &str, Option<&str>)],
        ) -> serde_json::Value {
            let root = self
                .path()
                .join("packages")
                .join(id.to_lowercase())
                .join(version);
            let mut asset_records = Vec::new();
            for (path, kind, platform) in assets {
                let file = root.join(path);
                std::fs::create_dir_all(file.parent().unwrap()).unwrap();
                std::fs::write(&file, format!("{id} {version} {path}")).unwrap();
                asset_records.push(json!({
                    "path": path,
                    "kind": kind,
                    "platform": platform,
                }));
            }
            json!({
                "id": id,
                "version": version,
                "root": root,
                "assets": asset_records,
            })
        }

        fn write_closure(
            &self,
            name: &str,
            platform: &str,
            packages: Vec<serde_json::Value>,
        ) -> PathBuf {
            let path = self.path().join(name);
            let closure = json!({ "platform": platform, "packages": packages });
            std::fs::write(&path, serde_json::to_string_pretty(&closure).unwrap()).unwrap();
            path
        }

        fn write_baseline(&self, name: &str, baseline: serde_json::Value) -> PathBuf {
            let path = self.path().join(name);
            std::fs::write(&path, serde_json::to_string(&baseline).unwrap()).unwrap();
            path
        }

        fn output(&self) -> PathBuf {
            self.path().join("outdir")
        }

        fn staging(&self) -> PathBuf {
            self.path().join("w")
        }
    }

    /// The apphost scenario: a native launcher with platform-specific
    /// assets, a managed lib, and a package the baseline covers.
    fn apphost_fixture(fx: &Fixture) -> (PathBuf, PathBuf) {
        let apphost = fx.package(
            "runtime.win7-x64.appHost",
            "1.2.0-beta-001304-00",
            &[
                ("runtimes/win7-x64/native/apphost.exe", "native", Some("win7-x64")),
                ("runtimes/linux-x64/native/apphost", "native", Some("linux-x64")),
            ],
        );
        let uri = fx.package(
            "System.Private.Uri",
            "4.4.0-beta-24821-02",
            &[("lib/netstandard1.0/System.Private.Uri.dll", "managed", Some("win"))],
        );
        let targets = fx.package(
            "Microsoft.NETCore.Targets",
            "1.2.0-beta-24821-02",
            &[("ref/netstandard/_._", "compile", None)],
        );

        let closure = fx.write_closure(
            "app.json",
            "win7-x64",
            vec![apphost, uri, targets],
        );
        let baseline = fx.write_baseline(
            "baseline.json",
            json!({
                "platform": "win7-x64",
                "packages": [ { "id": "System.Private.Uri" } ],
            }),
        );
        (closure, baseline)
    }

    /// File paths under a directory, relative, forward slashes, sorted
    fn tree(dir: &Path) -> Vec<String> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(d) = pending.pop() {
            for entry in std::fs::read_dir(&d).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    files.push(
                        path.strip_prefix(dir)
                            .unwrap()
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect::<Vec<_>>()
                            .join("/"),
                    );
                }
            }
        }
        files.sort();
        files
    }

    #[test]
    fn compose_dependencies() {
        let fx = Fixture::new();
        let (closure, baseline) = apphost_fixture(&fx);

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure)
            .arg("--baseline")
            .arg(&baseline)
            .args(["--platform", "win7-x64", "--no-decorate"])
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .success();

        // Exactly the launcher asset and the manifest; the baseline
        // package and the compile-only package leave nothing behind.
        assert_eq!(
            tree(&fx.output()),
            vec![
                "artifact.xml".to_string(),
                "runtime.win7-x64.apphost/1.2.0-beta-001304-00/runtimes/win7-x64/native/apphost.exe"
                    .to_string(),
            ]
        );

        let manifest = std::fs::read_to_string(fx.output().join("artifact.xml")).unwrap();
        assert!(manifest
            .contains("Id=\"runtime.win7-x64.appHost\" Version=\"1.2.0-beta-001304-00\""));
        assert!(!manifest.contains("System.Private.Uri"));
        assert!(!manifest.contains("Microsoft.NETCore.Targets"));
    }

    #[test]
    fn compose_with_fxfiles() {
        // Skipping baseline removal keeps the shared-runtime lib
        let fx = Fixture::new();
        let (closure, baseline) = apphost_fixture(&fx);

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure)
            .arg("--baseline")
            .arg(&baseline)
            .args([
                "--platform",
                "win7-x64",
                "--no-decorate",
                "--skip-baseline-removal",
            ])
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .success();

        let files = tree(&fx.output());
        assert!(files.contains(
            &"system.private.uri/4.4.0-beta-24821-02/lib/netstandard1.0/System.Private.Uri.dll"
                .to_string()
        ));

        let manifest = std::fs::read_to_string(fx.output().join("artifact.xml")).unwrap();
        assert!(manifest.contains("Id=\"System.Private.Uri\""));
    }

    #[test]
    fn compose_dependencies_noopt() {
        let fx = Fixture::new();
        let (closure, baseline) = apphost_fixture(&fx);

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure)
            .arg("--baseline")
            .arg(&baseline)
            .args([
                "--platform",
                "win7-x64",
                "--no-decorate",
                "--skip-optimization",
                "--retain-staging",
            ])
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .success();

        assert!(fx
            .output()
            .join("runtime.win7-x64.apphost")
            .join("1.2.0-beta-001304-00")
            .exists());

        // The working directory survives when asked for
        assert!(fx.staging().exists());
    }

    #[test]
    fn cache_nativeonlyassets() {
        let fx = Fixture::new();
        let apphost = fx.package(
            "runtime.win7-x64.appHost",
            "1.2.0-beta-001304-00",
            &[("runtimes/win7-x64/native/apphost.exe", "native", Some("win7-x64"))],
        );
        let closure = fx.write_closure("app.json", "win7-x64", vec![apphost]);

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure)
            .args(["--platform", "win7-x64", "--no-decorate"])
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .success();

        assert_eq!(
            tree(&fx.output()),
            vec![
                "artifact.xml".to_string(),
                "runtime.win7-x64.apphost/1.2.0-beta-001304-00/runtimes/win7-x64/native/apphost.exe"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn compose_multifile() {
        // Two closures pinning different versions of the same package id
        let fx = Fixture::new();
        let json_901 = fx.package(
            "Newtonsoft.Json",
            "9.0.1",
            &[("lib/netstandard1.0/Newtonsoft.Json.dll", "managed", None)],
        );
        let json_902 = fx.package(
            "Newtonsoft.Json",
            "9.0.2-beta2",
            &[("lib/netstandard1.1/Newtonsoft.Json.dll", "managed", None)],
        );
        let fluent = fx.package(
            "FluentAssertions.Json",
            "4.12.0",
            &[("lib/netstandard1.3/FluentAssertions.Json.dll", "managed", None)],
        );

        let closure_a = fx.write_closure("a.json", "win7-x64", vec![json_901, fluent]);
        let closure_b = fx.write_closure("b.json", "win7-x64", vec![json_902]);

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure_a)
            .arg("--closure")
            .arg(&closure_b)
            .args(["--platform", "win7-x64", "--no-decorate"])
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .success();

        let files = tree(&fx.output());
        for expected in [
            "newtonsoft.json/9.0.1/lib/netstandard1.0/Newtonsoft.Json.dll",
            "newtonsoft.json/9.0.2-beta2/lib/netstandard1.1/Newtonsoft.Json.dll",
            "fluentassertions.json/4.12.0/lib/netstandard1.3/FluentAssertions.Json.dll",
        ] {
            assert!(files.contains(&expected.to_string()), "missing {expected}");
        }

        let manifest = std::fs::read_to_string(fx.output().join("artifact.xml")).unwrap();
        assert!(manifest.contains("Id=\"Newtonsoft.Json\" Version=\"9.0.1\""));
        assert!(manifest.contains("Id=\"Newtonsoft.Json\" Version=\"9.0.2-beta2\""));
        assert!(manifest.contains("Id=\"FluentAssertions.Json\" Version=\"4.12.0\""));
    }

    #[test]
    fn compose_decorated_output() {
        let fx = Fixture::new();
        let apphost = fx.package(
            "appHost",
            "1.2.0",
            &[("runtimes/win7-x64/native/apphost.exe", "native", Some("win7-x64"))],
        );
        let closure = fx.write_closure("app.json", "win7-x64", vec![apphost]);

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure)
            .args(["--platform", "win7-x64"])
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .success();

        assert!(fx.output().join("win7-x64").join("artifact.xml").exists());
    }

    #[test]
    fn compose_required_package_missing_fails() {
        let fx = Fixture::new();
        let lib = fx.package("libA", "1.0.0", &[("lib/LibA.dll", "managed", None)]);
        let closure = fx.write_closure("app.json", "win7-x64", vec![lib]);

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure)
            .args([
                "--platform",
                "win7-x64",
                "--no-decorate",
                "--require",
                "appHost",
            ])
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .failure()
            .stderr(predicate::str::contains("apphost"))
            .stderr(predicate::str::contains("win7-x64"));

        assert!(!fx.output().exists());
    }

    #[test]
    fn compose_populated_output_fails_untouched() {
        let fx = Fixture::new();
        let lib = fx.package("libA", "1.0.0", &[("lib/LibA.dll", "managed", None)]);
        let closure = fx.write_closure("app.json", "win7-x64", vec![lib]);

        std::fs::create_dir_all(fx.output()).unwrap();
        std::fs::write(fx.output().join("stray.txt"), b"keep me").unwrap();

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure)
            .args(["--platform", "win7-x64", "--no-decorate"])
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .failure()
            .stderr(predicate::str::contains("already contains files"));

        let stray = std::fs::read_to_string(fx.output().join("stray.txt")).unwrap();
        assert_eq!(stray, "keep me");
    }

    #[test]
    fn compose_conflicting_closures_fail() {
        let fx = Fixture::new();
        let lib_a = fx.package("libA", "1.0.0", &[("lib/LibA.dll", "managed", None)]);
        let lib_a_other = fx.package("libA", "1.0.0", &[("lib/Other.dll", "managed", None)]);

        let closure_a = fx.write_closure("a.json", "win7-x64", vec![lib_a]);
        let closure_b = fx.write_closure("b.json", "win7-x64", vec![lib_a_other]);

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure_a)
            .arg("--closure")
            .arg(&closure_b)
            .args(["--platform", "win7-x64", "--no-decorate"])
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .failure()
            .stderr(predicate::str::contains("differing asset lists"));
    }

    #[cfg(unix)]
    #[test]
    fn compose_with_external_optimizer() {
        use std::os::unix::fs::PermissionsExt;

        let fx = Fixture::new();
        let tool = fx.path().join("aotc.sh");
        std::fs::write(&tool, "#!/bin/sh\n{ printf 'AOT:'; cat \"$1\"; } > \"$2\"\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let lib = fx.package("libA", "1.0.0", &[("lib/LibA.dll", "managed", None)]);
        let closure = fx.write_closure("app.json", "win7-x64", vec![lib]);

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure)
            .args(["--platform", "win7-x64", "--no-decorate"])
            .arg("--optimizer")
            .arg(&tool)
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .success();

        let optimized =
            std::fs::read_to_string(fx.output().join("liba/1.0.0/lib/LibA.dll")).unwrap();
        assert!(optimized.starts_with("AOT:"));
    }

    #[cfg(unix)]
    #[test]
    fn compose_failing_optimizer_publishes_nothing() {
        use std::os::unix::fs::PermissionsExt;

        let fx = Fixture::new();
        let tool = fx.path().join("aotc.sh");
        std::fs::write(&tool, "#!/bin/sh\necho 'corrupt assembly' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let lib = fx.package("libA", "1.0.0", &[("lib/LibA.dll", "managed", None)]);
        let closure = fx.write_closure("app.json", "win7-x64", vec![lib]);

        packstore()
            .arg("compose")
            .arg("--closure")
            .arg(&closure)
            .args(["--platform", "win7-x64", "--no-decorate"])
            .arg("--optimizer")
            .arg(&tool)
            .arg("--output")
            .arg(fx.output())
            .arg("--staging")
            .arg(fx.staging())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Optimization failed"));

        assert!(!fx.output().exists());
        assert!(!fx.staging().exists());
    }

    #[test]
    fn compose_twice_produces_identical_manifests() {
        let fx = Fixture::new();
        let (closure, baseline) = apphost_fixture(&fx);

        for out in ["out-a", "out-b"] {
            packstore()
                .arg("compose")
                .arg("--closure")
                .arg(&closure)
                .arg("--baseline")
                .arg(&baseline)
                .args(["--platform", "win7-x64", "--no-decorate"])
                .arg("--output")
                .arg(fx.path().join(out))
                .arg("--staging")
                .arg(fx.path().join(format!("w-{out}")))
                .assert()
                .success();
        }

        let manifest_a = std::fs::read(fx.path().join("out-a/artifact.xml")).unwrap();
        let manifest_b = std::fs::read(fx.path().join("out-b/artifact.xml")).unwrap();
        assert_eq!(manifest_a, manifest_b);
        assert_eq!(
            tree(&fx.path().join("out-a")),
            tree(&fx.path().join("out-b"))
        );
    }
}
