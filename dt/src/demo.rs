//! Demo scenarios run by the `dt` binary
//!
//! Each scenario returns the transcript of what its components observed, one
//! line per observation, so the binary and the tests can both check it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use eyre::Result;
use serde_json::json;
use tokio::task::LocalSet;
use tracing::{debug, info};

use crate::app::{Application, LocalTaskScheduler};
use crate::cli::SchedulerKind;
use crate::config::AppConfig;
use crate::dash::Dash;
use crate::emitter::ChildListenOptions;
use crate::event::{ComponentEvent, Delivery};

type Transcript = Rc<RefCell<Vec<String>>>;

fn note(transcript: &Transcript, line: String) {
    debug!(%line, "demo: observed");
    transcript.borrow_mut().push(line);
}

/// One entry of the todo list
struct Task {
    dash: Dash,
    label: String,
    update_mode: Cell<bool>,
    delivery: Delivery,
}

impl Task {
    /// Enter edit mode and take the focus from the other tasks
    fn select(&self) -> Result<()> {
        self.set_update_mode(true)?;
        self.dash.emit("grabFocus", json!(self.label), self.delivery)?;
        Ok(())
    }

    fn set_update_mode(&self, mode: bool) -> Result<()> {
        if self.update_mode.replace(mode) == mode {
            return Ok(());
        }
        self.dash.emit("enabled", json!(mode), Delivery::Sync)?;
        Ok(())
    }
}

/// Root of the todo scenario: keeps a single task in edit mode
struct TodoList {
    dash: Dash,
    transcript: Transcript,
    delivery: Delivery,
}

impl TodoList {
    /// When an item grabs the focus, every other item leaves edit mode
    fn watch_focus(&self) -> Result<()> {
        let list = self.dash.clone();
        let log = self.transcript.clone();
        self.dash
            .listen_to_children("grabFocus", ChildListenOptions::in_group("items"))?
            .on_event(move |event: &ComponentEvent| {
                let label: String = event.data_as()?;
                note(&log, format!("{label} grabbed focus"));
                for task in list.children_of::<Task>("items")? {
                    if task.dash.id() != event.origin() {
                        task.set_update_mode(false)?;
                    }
                }
                Ok(())
            });
        Ok(())
    }

    fn add(&self, label: String) -> Result<Rc<Task>> {
        let delivery = self.delivery;
        let task = self.dash.create(|dash| Task {
            dash,
            label,
            update_mode: Cell::new(true),
            delivery,
        })?;
        task.dash.expose_events(["grabFocus", "enabled"])?;
        self.dash.add_to_group(&task, "items")?;

        let log = self.transcript.clone();
        let name = task.label.clone();
        self.dash
            .listen_to(&task, "enabled")?
            .on_data(move |mode, _| {
                let state = if mode.as_bool().unwrap_or(false) { "editing" } else { "read-only" };
                note(&log, format!("{name} is {state}"));
                Ok(())
            });

        task.select()?;
        Ok(task)
    }
}

/// Add `tasks` tasks, then optionally select one of them (1-based)
pub fn run_todo(config: AppConfig, tasks: usize, select: Option<usize>, deferred: bool) -> Result<Vec<String>> {
    info!(tasks, ?select, deferred, "run_todo: called");
    let delivery = if deferred { Delivery::Deferred } else { Delivery::Sync };
    let transcript: Transcript = Rc::default();
    let app = Application::new(config);

    let list = app.create_root(|dash| TodoList {
        dash,
        transcript: transcript.clone(),
        delivery,
    })?;
    list.watch_focus()?;

    let mut created = Vec::new();
    for n in 1..=tasks {
        created.push(list.add(format!("task {n}"))?);
        app.run_pending();
    }

    if let Some(index) = select {
        let task = created
            .get(index.wrapping_sub(1))
            .ok_or_else(|| eyre::eyre!("no task {index} (have {})", created.len()))?;
        note(&transcript, format!("selecting {}", task.label));
        task.select()?;
        app.run_pending();
    }

    let editing: Vec<&str> = created
        .iter()
        .filter(|t| t.update_mode.get())
        .map(|t| t.label.as_str())
        .collect();
    note(&transcript, format!("editing: {}", editing.join(", ")));

    app.shutdown();
    drop(list);
    Ok(transcript.take())
}

struct TreeNode {
    dash: Dash,
    level: usize,
}

impl TreeNode {
    fn watch(&self, transcript: &Transcript, stop_at: Option<usize>) -> Result<()> {
        let log = transcript.clone();
        let level = self.level;
        let id = self.dash.id();
        self.dash
            .listen_to_children("ping", ChildListenOptions::default())?
            .on_event(move |event| {
                let origin = if event.is_from_deep() { "deep" } else { "direct" };
                note(&log, format!("level {level} (component {id}) got ping from {} [{origin}]", event.origin()));
                if stop_at == Some(level) {
                    note(&log, format!("level {level} stopped propagation"));
                    event.stop_propagation();
                }
                Ok(())
            });
        Ok(())
    }
}

/// Build `depth` levels with `fanout` children each; returns the last leaf
fn grow(
    parent: &TreeNode,
    depth: usize,
    fanout: usize,
    transcript: &Transcript,
    stop_at: Option<usize>,
) -> Result<Option<Rc<TreeNode>>> {
    if parent.level >= depth {
        return Ok(None);
    }
    let mut deepest = None;
    for _ in 0..fanout {
        let level = parent.level + 1;
        let child = parent.dash.create(|dash| TreeNode { dash, level })?;
        child.watch(transcript, stop_at)?;
        deepest = grow(&child, depth, fanout, transcript, stop_at)?.or(Some(child));
    }
    Ok(deepest)
}

fn plant(app: &Application, depth: usize, fanout: usize, transcript: &Transcript, stop_at: Option<usize>) -> Result<Rc<TreeNode>> {
    let root = app.create_root(|dash| TreeNode { dash, level: 0 })?;
    root.watch(transcript, stop_at)?;
    let leaf = grow(&root, depth, fanout, transcript, stop_at)?.unwrap_or_else(|| root.clone());
    note(
        transcript,
        format!("{} components, emitting from component {}", app.component_count(), leaf.dash.id()),
    );
    leaf.dash.emit("ping", json!(null), Delivery::Deferred)?;
    Ok(root)
}

/// Build a tree and bubble a deferred `ping` from its deepest leaf
pub async fn run_tree(
    config: AppConfig,
    depth: usize,
    fanout: usize,
    stop_at: Option<usize>,
    scheduler: SchedulerKind,
) -> Result<Vec<String>> {
    info!(depth, fanout, ?stop_at, ?scheduler, "run_tree: called");
    let fanout = fanout.max(1);
    let transcript: Transcript = Rc::default();

    match scheduler {
        SchedulerKind::Queue => {
            let app = Application::new(config);
            let _root = plant(&app, depth, fanout, &transcript, stop_at)?;
            let ran = app.run_pending();
            debug!(ran, "run_tree: queue drained");
            app.shutdown();
        }
        SchedulerKind::Tokio => {
            let app = Application::new(config).with_scheduler(Rc::new(LocalTaskScheduler));
            let local = LocalSet::new();
            let root = local.run_until(async { plant(&app, depth, fanout, &transcript, stop_at) }).await?;
            local.await;
            app.shutdown();
            drop(root);
        }
    }

    Ok(transcript.take())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_keeps_one_task_editing() {
        let lines = run_todo(AppConfig::default(), 3, Some(1), false).unwrap();
        assert!(lines.contains(&"task 3 grabbed focus".to_string()));
        assert!(lines.contains(&"task 2 is read-only".to_string()));
        assert_eq!(lines.last().unwrap(), "editing: task 1");
    }

    #[test]
    fn test_todo_deferred_matches_sync() {
        let sync = run_todo(AppConfig::default(), 2, Some(2), false).unwrap();
        let deferred = run_todo(AppConfig::default(), 2, Some(2), true).unwrap();
        assert_eq!(sync.last(), deferred.last());
        assert_eq!(deferred.last().unwrap(), "editing: task 2");
    }

    #[test]
    fn test_todo_rejects_unknown_selection() {
        assert!(run_todo(AppConfig::default(), 2, Some(5), false).is_err());
        assert!(run_todo(AppConfig::default(), 2, Some(0), false).is_err());
    }

    #[tokio::test]
    async fn test_tree_reaches_root() {
        let lines = run_tree(AppConfig::default(), 2, 2, None, SchedulerKind::Queue).await.unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("level 1") && lines[1].ends_with("[direct]"));
        assert!(lines[2].starts_with("level 0") && lines[2].ends_with("[deep]"));
    }

    #[tokio::test]
    async fn test_tree_stop_and_tokio_scheduler() {
        let lines = run_tree(AppConfig::default(), 3, 1, Some(2), SchedulerKind::Tokio).await.unwrap();
        assert_eq!(lines.last().unwrap(), "level 2 stopped propagation");
        assert!(!lines.iter().any(|l| l.starts_with("level 1")));
    }
}
