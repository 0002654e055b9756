mod common;
use crate::common::builders::virtual_id;
use crate::common::{decode_content_module, init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tempfile::tempdir;

use virtmod::config::PluginOptions;
use virtmod::fs::mock::MockFileSystem;
use virtmod::generator::Generator;
use virtmod::host::dev::{DevHost, DevReport, HostEvent};
use virtmod::manifest::ManifestGenerator;
use virtmod::{Command, GeneratorRegistry, InvocationContext, Loader, ReloadHandle, Session};

type TestResult = Result<(), Box<dyn Error>>;

fn demos_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos")
}

fn manifest_session() -> Session {
    let mut registry = GeneratorRegistry::new();
    registry.register_extension("toml", ManifestGenerator::factory());
    Session::new(PluginOptions::default(), Arc::new(registry))
}

#[tokio::test]
async fn demo_manifest_renders_data_queries_and_files() -> TestResult {
    init_tracing();

    let session = manifest_session();
    let id = session
        .resolve_id(&virtual_id(demos_dir().join("authors.toml"), &["lang=en"]))
        .expect("virtual id");

    let content = session.try_load(&id).await?.expect("content");
    let module = decode_content_module(&content.code);

    assert_eq!(module["data"], json!({ "title": "Authors", "count": 2 }));
    assert_eq!(module["queries"], json!({ "virtual-module": "", "lang": "en" }));
    assert_eq!(
        module["files"],
        json!({
            "watched/a.txt": "Ada Lovelace\n",
            "watched/b.txt": "Grace Hopper\n",
        })
    );
    assert_eq!(module["trigger"], json!(null));
    Ok(())
}

#[tokio::test]
async fn manifest_generator_reads_through_the_given_filesystem() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(
        "./list.toml",
        "watch = ['items/*.txt']\nwatch_events = ['change']\n\n[data]\nkind = 'list'\n",
    );
    fs.add_file("./items/two.txt", "2");
    fs.add_file("./items/one.txt", "1");
    let fs = Arc::new(fs);

    let generator = ManifestGenerator::with_fs("./list.toml", fs.clone());
    let ctx = InvocationContext {
        id: "\0./list.toml?virtual-module".into(),
        is_serve: false,
        import_path: "./list.toml?virtual-module".into(),
        command: Command::Build,
        file_path: "./list.toml".into(),
        queries: Default::default(),
        reload: ReloadHandle::detached("\0./list.toml?virtual-module"),
    };

    let loader: Loader = generator.generate(ctx).await?.expect("loader");
    assert_eq!(loader.patterns(), ["items/*.txt".to_string()]);
    assert_eq!(
        loader.effective_events(&[]),
        vec![virtmod::types::WatchEventKind::Change]
    );

    let content = loader
        .load(virtmod::WatchResult {
            files: vec!["items/one.txt".into(), "items/two.txt".into()],
            trigger: None,
        })
        .await?;
    let module = decode_content_module(&content.code);
    assert_eq!(module["data"]["kind"], "list");
    assert_eq!(module["files"], json!({ "items/one.txt": "1", "items/two.txt": "2" }));
    Ok(())
}

#[tokio::test]
async fn malformed_manifest_is_a_contract_error() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("broken.toml");
    fs::write(&path, "watch = 'not a list'\n")?;

    let session = manifest_session();
    let id = session
        .resolve_id(&virtual_id(&path, &[]))
        .expect("virtual id");
    let err = session.try_load(&id).await.unwrap_err();
    assert!(err.is_contract(), "{err}");
    assert!(err.to_string().contains("Generator failed"), "{err}");
    Ok(())
}

#[tokio::test]
async fn dev_host_build_mode_writes_each_module_once() -> TestResult {
    init_tracing();

    let ids = vec![
        virtual_id(demos_dir().join("authors.toml"), &[]),
        "plain.js".to_string(),
        virtual_id(demos_dir().join("missing.rs"), &[]),
    ];
    let mut host = DevHost::new(manifest_session(), Command::Build, Vec::new());
    let report = host.run(&ids).await?;
    assert_eq!(
        report,
        DevReport {
            produced: 1,
            failed: 1
        }
    );

    let out = String::from_utf8(host.into_output())?;
    let mut lines = out.lines();
    let header = format!("// {}", ids[0]);
    assert_eq!(lines.next(), Some(header.as_str()));
    assert!(lines.next().unwrap_or_default().starts_with("export default JSON.parse("));
    assert_eq!(lines.next(), None);
    Ok(())
}

#[tokio::test]
async fn dev_host_serve_mode_reproduces_invalidated_modules() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let manifest = dir.path().join("site.toml");
    fs::write(&manifest, "watch = ['pages/*.md']\n")?;
    fs::create_dir_all(dir.path().join("pages"))?;
    fs::write(dir.path().join("pages/index.md"), "# home")?;

    let id = virtual_id(&manifest, &[]);
    let mut host = DevHost::new(manifest_session(), Command::Serve, Vec::new());
    let tx = host.sender();

    let pages = dir.path().join("pages");
    let run = tokio::spawn(async move {
        let report = host.run(&[id]).await;
        (report, host.into_output())
    });

    // Give the host time to produce the module and subscribe.
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    fs::write(pages.join("about.md"), "# about")?;
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    tx.send(HostEvent::ShutdownRequested)?;

    let (report, out) = with_timeout(run).await?;
    let report = report?;
    assert_eq!(report.failed, 0);
    assert!(report.produced >= 2, "{report:?}");

    let out = String::from_utf8(out)?;
    let last_module = out
        .lines()
        .filter(|l| l.starts_with("export default"))
        .last()
        .expect("module output");
    let module = decode_content_module(last_module);
    assert_eq!(module["files"]["pages/about.md"], "# about");
    assert_eq!(module["trigger"]["path"], "pages/about.md");
    Ok(())
}

#[test]
fn generator_trait_is_object_safe() {
    fn accepts(_: Arc<dyn Generator>) {}
    accepts(Arc::new(ManifestGenerator::new("x.toml")));
}
