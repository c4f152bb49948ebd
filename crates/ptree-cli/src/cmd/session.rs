//! `pt session`: a line-oriented shell over one tree.
//!
//! The tree and its [`ViewState`] stay in memory between commands; nothing
//! reaches disk until `save`. A failing command prints `error: ...` and the
//! loop carries on.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::{Args, ValueEnum};
use ptree_analyze::analyze_tree;
use ptree_bridge::{AiBackend, AskRequest, ContextSnapshot, from_config};
use ptree_core::config::Config;
use ptree_core::file::write_atomic;
use ptree_core::view::{ViewState, details, visible_rows};
use ptree_core::{NewNode, NodePatch, NodeType, TreeFormat, write_tree};
use tracing::{debug, info};

use crate::cmd::analyze::render_report_text;
use crate::cmd::export::{ExportFormat, render_export};
use crate::cmd::show::render_show_human;
use crate::cmd::tree::render_rows_pretty;
use crate::cmd::tree_file::{self, LoadedTree, parent_arg};
use crate::output::OutputMode;

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Product tree XML or snapshot JSON.
    pub file: PathBuf,
}

const HELP: &str = "\
commands:
  ls                      show the visible tree
  open <id>|all           expand a node (or every node)
  close <id>|all          collapse a node (or every node)
  select <id>             select a node and show its details
  search [text]           filter by title/description; no text clears
  add <type> <title>      add a child under the selection (top level if none)
  set <field> <value>     change a field of the selected node
  rm [id]                 delete a node and its subtree (default: selection)
  mv <id> <parent|none>   move a node under another parent
  analyze                 run graph analysis
  ask <question>          ask the AI backend, focused on the selection
  export <xml|jira|json> [path]
                          print or write the tree in another format
  save [path]             write the tree (default: the file it came from)
  help                    show this list
  quit                    leave (quit! discards unsaved changes)";

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Session<'a> {
    loaded: LoadedTree,
    view: ViewState,
    config: &'a Config,
    backend: Box<dyn AiBackend>,
    dirty: bool,
    quit_warned: bool,
}

pub fn run_session(args: &SessionArgs, output: OutputMode, config: &Config) -> anyhow::Result<()> {
    let loaded = tree_file::load(&args.file, output)?;
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    run_session_io(loaded, config, stdin.lock(), io::stdout().lock(), interactive)
}

/// Drive a session from `input` until `quit` or end of input.
pub fn run_session_io<R: BufRead, W: Write>(
    loaded: LoadedTree,
    config: &Config,
    input: R,
    mut out: W,
    interactive: bool,
) -> anyhow::Result<()> {
    info!(file = %loaded.path.display(), nodes = loaded.tree.len(), "session started");
    let mut session = Session {
        loaded,
        view: ViewState::new(),
        config,
        backend: from_config(config),
        dirty: false,
        quit_warned: false,
    };
    writeln!(
        out,
        "{} nodes loaded from {}. Type 'help' for commands.",
        session.loaded.tree.len(),
        session.loaded.path.display()
    )?;

    let mut lines = input.lines();
    loop {
        if interactive {
            write!(out, "pt> ")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else { break };
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match session.execute(line, &mut out) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(err) => writeln!(out, "error: {err:#}")?,
        }
    }

    if session.dirty {
        writeln!(out, "warning: unsaved changes discarded")?;
    }
    Ok(())
}

impl Session<'_> {
    fn execute(&mut self, line: &str, out: &mut dyn Write) -> anyhow::Result<Flow> {
        let (command, rest) = split_word(line);
        debug!(command, "session command");
        if command != "quit" && command != "exit" {
            self.quit_warned = false;
        }
        match command {
            "ls" => self.list(out)?,
            "open" => self.expand(rest, true, out)?,
            "close" => self.expand(rest, false, out)?,
            "select" => self.select(rest, out)?,
            "search" => self.search(rest, out)?,
            "add" => self.add(rest, out)?,
            "set" => self.set(rest, out)?,
            "rm" => self.remove(rest, out)?,
            "mv" => self.reparent(rest, out)?,
            "analyze" => self.analyze(out)?,
            "ask" => self.ask(rest, out)?,
            "export" => self.export(rest, out)?,
            "save" => self.save(rest, out)?,
            "help" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => {
                if self.dirty && !self.quit_warned {
                    self.quit_warned = true;
                    writeln!(
                        out,
                        "unsaved changes; 'save' first, 'quit' again or 'quit!' to discard"
                    )?;
                } else {
                    return Ok(Flow::Quit);
                }
            }
            "quit!" => {
                self.dirty = false;
                return Ok(Flow::Quit);
            }
            other => bail!("unknown command '{other}' (try 'help')"),
        }
        Ok(Flow::Continue)
    }

    fn list(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        let rows = visible_rows(&self.loaded.tree, &self.view);
        render_rows_pretty(&self.loaded.tree, &rows, out)?;
        Ok(())
    }

    fn expand(&mut self, target: &str, open: bool, out: &mut dyn Write) -> anyhow::Result<()> {
        let tree = &self.loaded.tree;
        match (target, open) {
            ("", _) => bail!("usage: {} <id>|all", if open { "open" } else { "close" }),
            ("all", true) => self.view.expand_all(tree),
            ("all", false) => self.view.collapse_all(),
            (id, _) => {
                tree.get(id)?;
                if open {
                    self.view.expand(id);
                } else {
                    self.view.collapse(id);
                }
            }
        }
        self.list(out)
    }

    fn select(&mut self, id: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        if id.is_empty() {
            bail!("usage: select <id>");
        }
        if !self.view.select(&self.loaded.tree, id) {
            bail!("node '{id}' not found");
        }
        self.show_selected(out)
    }

    fn show_selected(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some(id) = self.view.selected.as_deref() else {
            return Ok(());
        };
        let record = details(&self.loaded.tree, id).ok_or_else(|| anyhow!("node '{id}' not found"))?;
        render_show_human(&record, out)?;
        Ok(())
    }

    fn search(&mut self, query: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        self.view.set_search(Some(query));
        self.list(out)
    }

    fn add(&mut self, rest: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let (node_type, title) = split_word(rest);
        if node_type.is_empty() || title.is_empty() {
            bail!("usage: add <type> <title>");
        }
        let fields = NewNode {
            node_type: NodeType::from(node_type),
            title: title.to_string(),
            ..NewNode::default()
        };
        let tree = &mut self.loaded.tree;
        let id = match self.view.selected.as_deref() {
            Some(parent) => tree.create(parent, fields)?.id.clone(),
            None => tree.create_root(fields)?.id.clone(),
        };
        self.dirty = true;
        self.view.select(&self.loaded.tree, &id);
        writeln!(out, "added {id}")?;
        Ok(())
    }

    fn set(&mut self, rest: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some(id) = self.view.selected.clone() else {
            bail!("nothing selected; use 'select <id>' first");
        };
        let (field, value) = split_word(rest);
        if field.is_empty() {
            bail!("usage: set <field> <value>  (fields: {})", NodePatch::FIELDS.join(", "));
        }
        let mut patch = NodePatch::default();
        patch.set_field(field, value)?;
        self.loaded.tree.update(&id, patch)?;
        self.dirty = true;
        writeln!(out, "updated {id}: {field}")?;
        Ok(())
    }

    fn remove(&mut self, target: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let id = match (target, self.view.selected.as_deref()) {
            ("", Some(selected)) => selected.to_string(),
            ("", None) => bail!("usage: rm <id>"),
            (id, _) => id.to_string(),
        };
        let removed = self.loaded.tree.delete(&id)?;
        self.view.prune(&self.loaded.tree);
        self.dirty = true;
        writeln!(out, "removed {} node(s)", removed.len())?;
        Ok(())
    }

    fn reparent(&mut self, rest: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let (id, parent) = split_word(rest);
        if id.is_empty() || parent.is_empty() {
            bail!("usage: mv <id> <parent|none>");
        }
        let parent = parent_arg(parent);
        self.loaded.tree.reparent(id, parent)?;
        if let Some(parent) = parent {
            self.view.expand(parent);
        }
        self.dirty = true;
        writeln!(out, "moved {id} under {}", parent.unwrap_or("(top level)"))?;
        Ok(())
    }

    fn analyze(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        let report = analyze_tree(&self.loaded.tree, &self.config.analysis);
        render_report_text(&report, out)?;
        Ok(())
    }

    fn ask(&self, question: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        if question.is_empty() {
            bail!("usage: ask <question>");
        }
        let tree = &self.loaded.tree;
        let caps = &self.config.ai.context;
        let context = match self.view.selected.as_deref() {
            Some(id) => ContextSnapshot::for_node(tree, id, caps)?,
            None => ContextSnapshot::overview(tree, caps),
        };
        let request = AskRequest::new(question)
            .with_context(Some(&context))
            .with_tree(tree);
        let answer = self.backend.ask(&request)?;
        writeln!(out, "[{}] {}", self.backend.name(), answer.trim_end())?;
        Ok(())
    }

    fn export(&self, rest: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let (format, path) = split_word(rest);
        let format = ExportFormat::from_str(format, true)
            .map_err(|_| anyhow!("usage: export <xml|jira|json> [path]"))?;
        let text = render_export(&self.loaded.tree, format, &self.config.export.reporter)?;
        if path.is_empty() {
            writeln!(out, "{text}")?;
        } else {
            write_atomic(Path::new(path), &text)?;
            writeln!(out, "exported to {path}")?;
        }
        Ok(())
    }

    fn save(&mut self, target: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let (path, format) = if target.is_empty() {
            (self.loaded.path.clone(), self.loaded.format)
        } else {
            let path = PathBuf::from(target);
            let format = TreeFormat::from_path(&path);
            (path, format)
        };
        write_tree(&self.loaded.tree, &path, format)
            .with_context(|| format!("saving to {}", path.display()))?;
        self.dirty = false;
        writeln!(out, "saved {} nodes to {}", self.loaded.tree.len(), path.display())?;
        Ok(())
    }
}

/// First whitespace-delimited word and the trimmed remainder.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    text.split_once(char::is_whitespace)
        .map_or((text, ""), |(head, tail)| (head, tail.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptree_core::config::BackendKind;
    use ptree_core::xml::import::import_xml;
    use tempfile::TempDir;

    const XML: &str = r#"<product_tree>
  <product id="p1" status="active" priority="high">
    <title>Shop</title>
    <goal id="g1" status="planned" priority="medium">
      <title>Checkout</title>
      <work_item id="w1" status="todo" priority="low"><title>Pay button</title></work_item>
    </goal>
  </product>
</product_tree>"#;

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.ai.backend = BackendKind::Offline;
        config
    }

    fn run(script: &str) -> (String, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("tree.xml");
        std::fs::write(&path, XML).expect("write fixture");
        let loaded = LoadedTree {
            tree: import_xml(XML).expect("import"),
            path,
            format: TreeFormat::Xml,
        };
        let mut out = Vec::new();
        run_session_io(loaded, &offline_config(), script.as_bytes(), &mut out, false)
            .expect("session");
        (String::from_utf8(out).expect("utf8"), dir)
    }

    #[test]
    fn split_word_trims_both_parts() {
        assert_eq!(split_word("  set  status   done "), ("set", "status   done"));
        assert_eq!(split_word("ls"), ("ls", ""));
    }

    #[test]
    fn select_shows_details() {
        let (out, _dir) = run("select w1\n");
        assert!(out.contains("Pay button"));
    }

    #[test]
    fn unknown_command_reports_and_continues() {
        let (out, _dir) = run("frobnicate\nselect nope\nhelp\n");
        assert!(out.contains("error: unknown command 'frobnicate'"));
        assert!(out.contains("error: node 'nope' not found"));
        assert!(out.contains("commands:"));
    }

    #[test]
    fn add_set_and_save_round_trip() {
        let (out, dir) = run("select g1\nadd work_item Refunds\nset status in_progress\nsave\nquit\n");
        assert!(out.contains("added g1.work_item_1"), "{out}");
        assert!(out.contains("saved 4 nodes"), "{out}");
        let saved = std::fs::read_to_string(dir.path().join("tree.xml")).expect("read");
        assert!(saved.contains("Refunds"));
        assert!(saved.contains("in_progress"));
    }

    #[test]
    fn quit_with_unsaved_changes_asks_twice() {
        let (out, _dir) = run("rm w1\nquit\nquit\n");
        assert!(out.contains("removed 1 node(s)"));
        assert!(out.contains("unsaved changes;"));
        assert!(out.contains("warning: unsaved changes discarded"));
    }

    #[test]
    fn ask_uses_offline_backend() {
        let (out, _dir) = run("ask give me a summary\n");
        assert!(out.contains("[offline]"), "{out}");
    }

    #[test]
    fn move_rejects_cycles() {
        let (out, _dir) = run("mv g1 w1\n");
        assert!(out.contains("error:"), "{out}");
    }
}
