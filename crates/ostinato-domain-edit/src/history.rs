use crate::command::EditCommand;
use crate::selection::Selection;
use ostinato_domain_score::ScoreDocument;

/// Undo/redo log. `record` is the only path that durably changes document
/// history: it runs the command's forward effect, pushes it, and clears
/// the redo stack so history never branches.
#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<EditCommand>,
    redo_stack: Vec<EditCommand>,
}

impl History {
    pub fn record(
        &mut self,
        command: EditCommand,
        doc: &mut ScoreDocument,
        selection: &mut Selection,
    ) {
        command.apply(doc, selection);
        selection.retain_valid(doc);
        self.undo_stack.push(command);
        self.redo_stack.clear();
    }

    /// No-op on an empty stack. Returns whether anything was undone.
    pub fn undo(&mut self, doc: &mut ScoreDocument, selection: &mut Selection) -> bool {
        let Some(command) = self.undo_stack.pop() else {
            return false;
        };
        command.revert(doc, selection);
        selection.retain_valid(doc);
        self.redo_stack.push(command);
        true
    }

    /// No-op on an empty stack. Returns whether anything was redone.
    pub fn redo(&mut self, doc: &mut ScoreDocument, selection: &mut Selection) -> bool {
        let Some(command) = self.redo_stack.pop() else {
            return false;
        };
        command.apply(doc, selection);
        selection.retain_valid(doc);
        self.undo_stack.push(command);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Both stacks go; used on full document reload.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
