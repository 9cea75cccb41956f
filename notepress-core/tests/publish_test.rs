//! End-to-end publish runs against an in-memory note store.

use notepress_core::store::memory::MemoryNote;
use notepress_core::{Config, MemoryStore, NoteId, NoteState, PublishError, PublishPipeline};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

fn config(root: &Path, extra: &str) -> Config {
    let yaml = format!(
        r#"
store:
  workspace: "{workspace}"
site:
  root: "{site}"
  section: "notes"
format:
  auto_space: false
  fix_term_typo: false
{extra}
"#,
        workspace = root.join("workspace").display(),
        site = root.join("site").display(),
    );
    Config::from_yaml(&yaml).unwrap()
}

fn with_policy(root: &Path, policy: &str) -> Config {
    config(root, &format!("publish:\n  on_fetch_failure: {policy}\n"))
}

fn note_dir(root: &Path, slug: &str) -> PathBuf {
    root.join("site/content/notes").join(slug)
}

fn index_md(root: &Path, slug: &str) -> String {
    fs::read_to_string(note_dir(root, slug).join("index.md")).unwrap()
}

fn write_asset(root: &Path, name: &str, contents: &str) {
    let dir = root.join("workspace/data/assets");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

/// Every file under the site root with its bytes
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root.join("site"))
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn ids(raw: &[&str]) -> Vec<NoteId> {
    raw.iter().map(|s| NoteId::new(*s)).collect()
}

#[tokio::test]
async fn test_reference_cycle() {
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new()
        .with_note(MemoryNote::new("a", "A").published().content("to ((b))"))
        .with_note(MemoryNote::new("b", "B").content("back to ((a))"));

    let report = PublishPipeline::new(config(temp.path(), ""), store)
        .publish()
        .await
        .unwrap();

    assert_eq!(report.emitted, ids(&["a", "b"]));
    assert!(index_md(temp.path(), "a")
        .ends_with("+++\n\nto [B](/notes/b/)\n\n---\n\nBacklinks\n\n1. [B](/notes/b/)\n"));
    assert!(index_md(temp.path(), "b")
        .ends_with("+++\n\nback to [A](/notes/a/)\n\n---\n\nBacklinks\n\n1. [A](/notes/a/)\n"));
    assert_eq!(report.state(&NoteId::new("b")), Some(NoteState::Done));
}

#[tokio::test]
async fn test_each_note_emitted_once() {
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new()
        .with_note(MemoryNote::new("a", "A").published().content("((b)) ((c)) ((b-2))"))
        .with_note(MemoryNote::new("c", "C").published().content("((b)) and ((a))"))
        .with_note(MemoryNote::new("b", "B").block("b-2").content("((c)) ((b))"));

    let pipeline = PublishPipeline::new(config(temp.path(), ""), store);
    let report = pipeline.publish().await.unwrap();

    assert_eq!(report.emitted, ids(&["a", "c", "b"]));
    for id in ["a", "b", "c"] {
        assert_eq!(pipeline.store().content_fetches(id), 1, "note {id}");
    }

    let b = index_md(temp.path(), "b");
    assert!(b.ends_with("1. [A](/notes/a/)\n2. [C](/notes/c/)\n"));
}

#[tokio::test]
async fn test_backlinks_list_every_referrer() {
    for (first, second) in [("x1", "x2"), ("x2", "x1")] {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new()
            .with_note(MemoryNote::new(first, &first.to_uppercase()).published().content("((y))"))
            .with_note(MemoryNote::new(second, &second.to_uppercase()).published().content("((y))"))
            .with_note(MemoryNote::new("y", "Y").content("target"));

        PublishPipeline::new(config(temp.path(), ""), store)
            .publish()
            .await
            .unwrap();

        let y = index_md(temp.path(), "y");
        assert!(y.contains("[X1](/notes/x1/)"), "order {first}, {second}");
        assert!(y.contains("[X2](/notes/x2/)"), "order {first}, {second}");
        assert!(y.ends_with(&format!(
            "1. [{}](/notes/{first}/)\n2. [{}](/notes/{second}/)\n",
            first.to_uppercase(),
            second.to_uppercase()
        )));
    }
}

#[tokio::test]
async fn test_slug_and_link_path() {
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new()
        .with_note(MemoryNote::new("a", "Index").published().content("See ((m \"my notes\"))."))
        .with_note(MemoryNote::new("m", "My Notes").content("hi"));

    PublishPipeline::new(config(temp.path(), ""), store)
        .publish()
        .await
        .unwrap();

    assert!(index_md(temp.path(), "index").contains("See [my notes](/notes/my-notes/)."));
    assert!(note_dir(temp.path(), "my-notes").join("index.md").is_file());
}

#[tokio::test]
async fn test_two_runs_are_identical() {
    let temp = TempDir::new().unwrap();
    write_asset(temp.path(), "pic.png", "png bytes");

    let store = || {
        MemoryStore::new()
            .with_note(
                MemoryNote::new("a", "Alpha")
                    .published()
                    .tags("#rust#")
                    .asset("assets/pic.png")
                    .attribute("custom-sn-weight", "2")
                    .content("![pic](assets/pic.png) and ((b \"Beta\"))"),
            )
            .with_note(MemoryNote::new("b", "Beta").content("((a))"))
    };

    PublishPipeline::new(config(temp.path(), ""), store())
        .publish()
        .await
        .unwrap();
    let first = snapshot(temp.path());

    PublishPipeline::new(config(temp.path(), ""), store())
        .publish()
        .await
        .unwrap();
    let second = snapshot(temp.path());

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert!(first.contains_key(Path::new("site/content/notes/alpha/assets/pic.png")));
}

#[tokio::test]
async fn test_stale_assets_removed_without_clean() {
    let temp = TempDir::new().unwrap();
    write_asset(temp.path(), "a.png", "A");
    write_asset(temp.path(), "b.png", "B");
    let cfg = || {
        let mut cfg = config(temp.path(), "");
        cfg.site.clean = false;
        cfg
    };

    let before = MemoryStore::new().with_note(
        MemoryNote::new("n", "N")
            .published()
            .asset("assets/a.png")
            .asset("assets/b.png"),
    );
    let report = PublishPipeline::new(cfg(), before).publish().await.unwrap();
    assert_eq!(report.assets_copied, 2);

    let after = MemoryStore::new().with_note(MemoryNote::new("n", "N").published().asset("assets/a.png"));
    PublishPipeline::new(cfg(), after).publish().await.unwrap();

    let names: Vec<String> = fs::read_dir(note_dir(temp.path(), "n").join("assets"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.png"]);
}

#[tokio::test]
async fn test_missing_assets_leave_no_directory() {
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new()
        .with_note(MemoryNote::new("n", "N").published().asset("assets/missing.png"));

    let report = PublishPipeline::new(config(temp.path(), ""), store)
        .publish()
        .await
        .unwrap();

    assert_eq!(report.assets_copied, 0);
    assert!(!note_dir(temp.path(), "n").join("assets").exists());
}

/// a → b (fails once), c → d → b
fn flaky_store() -> MemoryStore {
    MemoryStore::new()
        .with_note(MemoryNote::new("a", "A").published().content("to ((b))"))
        .with_note(MemoryNote::new("c", "C").published().content("to ((d))"))
        .with_note(MemoryNote::new("d", "D").content("also ((b))"))
        .with_note(MemoryNote::new("b", "B").content("body of b"))
        .fail_content("b", Some(1))
}

#[tokio::test]
async fn test_abandon_policy_skips_failed_note() {
    let temp = TempDir::new().unwrap();
    let pipeline = PublishPipeline::new(with_policy(temp.path(), "abandon"), flaky_store());
    let report = pipeline.publish().await.unwrap();

    assert_eq!(report.emitted, ids(&["a", "c", "d"]));
    assert_eq!(pipeline.store().content_fetches("b"), 1);
    assert_eq!(report.state(&NoteId::new("b")), Some(NoteState::Skipped));
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, NoteId::new("b"));

    assert!(index_md(temp.path(), "a").ends_with("+++\n\nto B"));
    assert!(index_md(temp.path(), "d").contains("+++\n\nalso B\n\n---\n"));
    assert!(!note_dir(temp.path(), "b").exists());

    let sources: Vec<&str> = report
        .unresolved
        .iter()
        .filter(|u| u.target == "b")
        .map(|u| u.source.as_str())
        .collect();
    assert_eq!(sources, vec!["a", "d"]);
}

#[tokio::test]
async fn test_retry_policy_recovers_on_later_reference() {
    let temp = TempDir::new().unwrap();
    let pipeline = PublishPipeline::new(with_policy(temp.path(), "retry"), flaky_store());
    let report = pipeline.publish().await.unwrap();

    assert_eq!(report.emitted, ids(&["a", "c", "d", "b"]));
    assert_eq!(pipeline.store().content_fetches("b"), 2);
    assert!(report.skipped.is_empty());
    assert_eq!(report.state(&NoteId::new("b")), Some(NoteState::Done));

    assert!(index_md(temp.path(), "a").ends_with("+++\n\nto [B](/notes/b/)"));
    assert!(index_md(temp.path(), "b").ends_with("1. [A](/notes/a/)\n2. [D](/notes/d/)\n"));
}

#[tokio::test]
async fn test_retry_policy_gives_up_on_note_that_never_loads() {
    let temp = TempDir::new().unwrap();
    let store = flaky_store().fail_content("b", None);
    let pipeline = PublishPipeline::new(with_policy(temp.path(), "retry"), store);
    let report = pipeline.publish().await.unwrap();

    assert_eq!(report.emitted, ids(&["a", "c", "d"]));
    // once for a's reference, once more for d's
    assert_eq!(pipeline.store().content_fetches("b"), 2);
    assert_eq!(report.state(&NoteId::new("b")), Some(NoteState::Skipped));
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, NoteId::new("b"));

    assert!(index_md(temp.path(), "a").ends_with("+++\n\nto B"));
    assert!(index_md(temp.path(), "d").contains("+++\n\nalso B\n\n---\n"));
    assert!(!note_dir(temp.path(), "b").exists());

    let sources: Vec<&str> = report
        .unresolved
        .iter()
        .filter(|u| u.target == "b")
        .map(|u| u.source.as_str())
        .collect();
    assert_eq!(sources, vec!["a", "d"]);
}

/// a → blk-1 (lookup fails once), c → blk-2; both blocks belong to x
fn split_owner_store() -> MemoryStore {
    MemoryStore::new()
        .with_note(MemoryNote::new("a", "A").published().content("to ((blk-1))"))
        .with_note(MemoryNote::new("c", "C").published().content("to ((blk-2))"))
        .with_note(MemoryNote::new("x", "X").block("blk-1").block("blk-2").content("x body"))
        .fail_row("blk-1", Some(1))
}

#[tokio::test]
async fn test_failed_block_lookup_still_yields_backlink() {
    for policy in ["abandon", "retry"] {
        let temp = TempDir::new().unwrap();
        let pipeline = PublishPipeline::new(with_policy(temp.path(), policy), split_owner_store());
        let plan = pipeline.plan().await.unwrap();

        let emitted: Vec<&str> = plan.documents.iter().map(|d| d.id().as_str()).collect();
        assert_eq!(emitted, vec!["a", "c", "x"], "policy {policy}");

        let x = plan.documents.iter().find(|d| d.id().as_str() == "x").unwrap();
        let titles: Vec<&str> = x.backlinks.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"], "policy {policy}");

        let a = plan.documents.iter().find(|d| d.id().as_str() == "a").unwrap();
        assert_eq!(a.formatted_content, "to blk-1", "policy {policy}");
        assert_eq!(pipeline.store().row_fetches("blk-1"), 2, "policy {policy}");
    }
}

#[tokio::test]
async fn test_unreachable_target_stays_plain_text() {
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new().with_note(
        MemoryNote::new("a", "A")
            .published()
            .content("see ((nowhere \"elsewhere\")) and `((code))`"),
    );

    let report = PublishPipeline::new(config(temp.path(), ""), store)
        .publish()
        .await
        .unwrap();

    assert!(index_md(temp.path(), "a").ends_with("+++\n\nsee elsewhere and `((code))`"));
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].target, "nowhere");
}

#[tokio::test]
async fn test_front_matter_fields() {
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new().with_note(
        MemoryNote::new("a", "Rust Notes")
            .published()
            .created("20210808180117")
            .updated("20210910120000")
            .tags("#rust# #notes#")
            .attribute("custom-sn-lastmod", "2022-01-01T00:00:00")
            .attribute("custom-sn-author", "me")
            .content("body"),
    );

    PublishPipeline::new(config(temp.path(), ""), store)
        .publish()
        .await
        .unwrap();

    let text = index_md(temp.path(), "rust-notes");
    let front = text
        .strip_prefix("+++\n")
        .and_then(|rest| rest.split_once("+++\n"))
        .map(|(front, _)| front)
        .unwrap();
    let table: toml::Table = toml::from_str(front).unwrap();

    let keys: Vec<&str> = table.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["title", "date", "lastmod", "tags", "author"]);
    let datetime = |key: &str| table.get(key).and_then(|v| v.as_datetime()).map(|d| d.to_string());
    assert_eq!(table.get("title").and_then(|v| v.as_str()), Some("Rust Notes"));
    assert_eq!(datetime("date").as_deref(), Some("2021-08-08T18:01:17"));
    assert_eq!(datetime("lastmod").as_deref(), Some("2022-01-01T00:00:00"));
    assert_eq!(table.get("author").and_then(|v| v.as_str()), Some("me"));
}

#[tokio::test]
async fn test_clean_removes_unpublished_notes() {
    let temp = TempDir::new().unwrap();
    let stale = note_dir(temp.path(), "old-note");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("index.md"), "old").unwrap();

    let store = MemoryStore::new().with_note(MemoryNote::new("a", "A").published().content("x"));
    PublishPipeline::new(config(temp.path(), ""), store)
        .publish()
        .await
        .unwrap();

    assert!(!stale.exists());
    assert!(note_dir(temp.path(), "a").join("index.md").is_file());
}

#[tokio::test]
async fn test_typography_in_output() {
    let temp = TempDir::new().unwrap();
    let mut cfg = config(temp.path(), "");
    cfg.format.auto_space = true;
    cfg.format.fix_term_typo = true;

    let store = MemoryStore::new().with_note(
        MemoryNote::new("a", "A")
            .published()
            .content("在github上使用json\n\n```\ngithub json\n```\n"),
    );
    PublishPipeline::new(cfg, store).publish().await.unwrap();

    assert!(index_md(temp.path(), "a")
        .ends_with("+++\n\n在 GitHub 上使用 JSON\n\n```\ngithub json\n```\n"));
}

#[tokio::test]
async fn test_duplicate_slug_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new()
        .with_note(MemoryNote::new("a", "Twin").published().content("((b))"))
        .with_note(MemoryNote::new("b", "twin").content("x"));

    let result = PublishPipeline::new(config(temp.path(), ""), store).publish().await;

    assert!(matches!(result, Err(PublishError::DuplicateSlug { .. })));
    assert!(snapshot(temp.path()).is_empty());
}
