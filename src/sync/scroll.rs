/// What the thread view should do after the message list changed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    /// First non-empty load of a conversation: jump to the bottom.
    Initial,
    /// New messages arrived: follow them to the bottom.
    Grown,
    /// Same length, shorter, or still empty.
    Unchanged,
}

/// Classifies thread-length deltas.
///
/// `previous_length` is updated after every classification, whatever the
/// source of the update.
#[derive(Debug, Default, Clone)]
pub struct ScrollController {
    previous_length: usize,
}

impl ScrollController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, new_length: usize) -> ScrollAction {
        let previous = self.previous_length;
        self.previous_length = new_length;
        if previous == 0 && new_length > 0 {
            ScrollAction::Initial
        } else if previous > 0 && new_length > previous {
            ScrollAction::Grown
        } else {
            ScrollAction::Unchanged
        }
    }

    /// Reset the baseline; the next non-empty load counts as `Initial`.
    pub fn reset(&mut self) {
        self.previous_length = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_then_unchanged_then_grown() {
        let mut scroll = ScrollController::new();
        assert_eq!(scroll.observe(10), ScrollAction::Initial);
        assert_eq!(scroll.observe(10), ScrollAction::Unchanged);
        assert_eq!(scroll.observe(12), ScrollAction::Grown);
        assert_eq!(scroll.observe(12), ScrollAction::Unchanged);
    }

    #[test]
    fn empty_loads_do_nothing() {
        let mut scroll = ScrollController::new();
        assert_eq!(scroll.observe(0), ScrollAction::Unchanged);
        assert_eq!(scroll.observe(0), ScrollAction::Unchanged);
        assert_eq!(scroll.observe(3), ScrollAction::Initial);
    }

    #[test]
    fn shrinking_is_unchanged() {
        let mut scroll = ScrollController::new();
        scroll.observe(5);
        assert_eq!(scroll.observe(4), ScrollAction::Unchanged);
        assert_eq!(scroll.observe(5), ScrollAction::Grown);
    }

    #[test]
    fn shrink_to_zero_rearms_initial() {
        let mut scroll = ScrollController::new();
        scroll.observe(5);
        assert_eq!(scroll.observe(0), ScrollAction::Unchanged);
        assert_eq!(scroll.observe(2), ScrollAction::Initial);
    }

    #[test]
    fn reset_rearms_initial() {
        let mut scroll = ScrollController::new();
        scroll.observe(5);
        scroll.reset();
        assert_eq!(scroll.observe(5), ScrollAction::Initial);
    }

    #[test]
    fn initial_once_per_selection() {
        let mut scroll = ScrollController::new();
        let actions: Vec<ScrollAction> =
            [0, 3, 3, 4, 4, 9].iter().map(|n| scroll.observe(*n)).collect();
        let initials = actions.iter().filter(|a| **a == ScrollAction::Initial).count();
        assert_eq!(initials, 1);
        assert_eq!(
            actions,
            vec![
                ScrollAction::Unchanged,
                ScrollAction::Initial,
                ScrollAction::Unchanged,
                ScrollAction::Grown,
                ScrollAction::Unchanged,
                ScrollAction::Grown,
            ]
        );
    }
}
