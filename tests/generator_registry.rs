mod common;
use crate::common::fakes::counting_factory;
use crate::common::init_tracing;

use std::sync::atomic::Ordering;

use virtmod::address::bust;
use virtmod::generator::GeneratorImporter;
use virtmod::types::{WatchEventKind, WatchOptions};
use virtmod::{GeneratorRegistry, InvocationContext, Loader};

fn noop(_ctx: InvocationContext) -> std::future::Ready<anyhow::Result<Option<Loader>>> {
    std::future::ready(Ok(Some(Loader::from_content("x"))))
}

#[test]
fn instances_are_cached_per_address() {
    init_tracing();

    let (factory, count) = counting_factory(noop);
    let mut registry = GeneratorRegistry::new();
    registry.register("./gen.rs", factory);

    registry.import("./gen.rs?virtual-module").unwrap();
    registry.import("./gen.rs?virtual-module").unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    registry.import("./gen.rs?virtual-module&type=a").unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    registry.import(&bust("./gen.rs?virtual-module")).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 3);
    // The busted instance replaced the plain one; `type=a` is untouched.
    assert_eq!(registry.instance_count(), 2);
    registry.import("./gen.rs?virtual-module&type=a").unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn repeated_busts_keep_one_instance_per_address() {
    let (factory, count) = counting_factory(noop);
    let mut registry = GeneratorRegistry::new();
    registry.register("./gen.rs", factory);

    registry.import("./gen.rs?virtual-module").unwrap();
    for _ in 0..50 {
        let busted = bust("./gen.rs?virtual-module");
        registry.import(&busted).unwrap();
        registry.import(&busted).unwrap();
        assert_eq!(registry.instance_count(), 1);
    }
    assert_eq!(count.load(Ordering::SeqCst), 51);

    // Back on the plain address after a bust: fresh instance, still one entry.
    registry.import("./gen.rs?virtual-module").unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 52);
    assert_eq!(registry.instance_count(), 1);
}

#[test]
fn path_registrations_win_over_extensions() {
    let (by_path, path_count) = counting_factory(noop);
    let (by_ext, ext_count) = counting_factory(noop);
    let mut registry = GeneratorRegistry::new();
    registry
        .register("./special.toml", by_path)
        .register_extension(".toml", by_ext);

    registry.import("./special.toml?virtual-module").unwrap();
    registry.import("./other.toml?virtual-module").unwrap();
    assert_eq!(path_count.load(Ordering::SeqCst), 1);
    assert_eq!(ext_count.load(Ordering::SeqCst), 1);
}

#[test]
fn unknown_generators_fail_to_import() {
    let registry = GeneratorRegistry::new();
    let err = registry.import("./gen.rs?virtual-module").err().expect("import fails");
    assert!(err.to_string().contains("no generator registered"), "{err}");
}

#[test]
fn loader_overrides_fall_back_to_plugin_defaults() {
    let defaults = WatchOptions {
        ignored: Some(vec!["**/*.tmp".into()]),
        ..WatchOptions::default()
    };
    let plain = Loader::from_content("x").watch(["a/*.txt"]);
    assert!(plain.has_watch());
    assert_eq!(plain.effective_events(&WatchEventKind::ALL), WatchEventKind::ALL.to_vec());
    assert_eq!(plain.effective_options(&defaults), defaults);

    let tuned = Loader::from_content("x")
        .watch(["a/*.txt"])
        .watch_events([WatchEventKind::Change])
        .watch_options(WatchOptions {
            depth: Some(0),
            ..WatchOptions::default()
        });
    assert_eq!(tuned.effective_events(&WatchEventKind::ALL), vec![WatchEventKind::Change]);
    let merged = tuned.effective_options(&defaults);
    assert_eq!(merged.depth, Some(0));
    assert_eq!(merged.ignored(), ["**/*.tmp".to_string()]);

    assert!(!Loader::from_content("x").has_watch());
}
