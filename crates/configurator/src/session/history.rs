//! Undo/redo functionality

use super::SceneSession;

impl SceneSession {
    /// Undo last change
    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.config, prev);
        self.redo_stack.push(current);
        self.version += 1;
        true
    }

    /// Redo last undone change
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.config, next);
        self.undo_stack.push(current);
        self.version += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::super::MAX_UNDO;
    use super::*;
    use crate::fixtures::door_scene;

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut s = SceneSession::new(door_scene());
        let original = s.config().clone();
        s.set_visibility("frame", false);
        let hidden = s.config().clone();

        assert!(s.undo());
        assert_eq!(s.config(), &original);
        assert!(s.can_redo());
        assert!(s.redo());
        assert_eq!(s.config(), &hidden);
        assert!(!s.redo());
        assert_eq!(s.version(), 3);
    }

    #[test]
    fn test_new_change_clears_redo() {
        let mut s = SceneSession::new(door_scene());
        s.set_visibility("frame", false);
        s.undo();
        s.set_visibility("glass", false);
        assert!(!s.can_redo());
    }

    #[test]
    fn test_undo_stack_capped() {
        let mut s = SceneSession::new(door_scene());
        for _ in 0..(MAX_UNDO + 20) {
            s.toggle_visibility("handle");
        }
        let mut undone = 0;
        while s.undo() {
            undone += 1;
        }
        assert_eq!(undone, MAX_UNDO);
    }
}
