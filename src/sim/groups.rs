//! Trigger groups and modifier activation tracking
//!
//! Unlocking a group flips every `LockedOff` cell of that group to `None`
//! directly in the matrix, so the very next collision sample sees it.

use std::collections::BTreeSet;

use glam::Vec2;

use crate::level::{CellRef, Lock, Matrix};

#[derive(Debug, Clone, Default)]
pub struct GroupRegistry {
    unlocked_groups: BTreeSet<u32>,
    /// Modifier cells currently inside the player's activation radius
    active_modifiers: BTreeSet<CellRef>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unlocked(&self, group: u32) -> bool {
        self.unlocked_groups.contains(&group)
    }

    pub fn unlocked_groups(&self) -> impl Iterator<Item = u32> + '_ {
        self.unlocked_groups.iter().copied()
    }

    /// Unlock `group` and release its cells in `matrix`
    ///
    /// Returns true only on the locked -> unlocked transition; an already
    /// unlocked group leaves the matrix untouched.
    pub fn unlock(&mut self, group: u32, matrix: &mut Matrix) -> bool {
        if group == 0 || !self.unlocked_groups.insert(group) {
            return false;
        }
        let released = release_group(group, matrix);
        log::info!("Group {} unlocked ({} cells released)", group, released);
        true
    }

    /// Re-apply every unlocked group to a (new) matrix
    pub fn reapply(&self, matrix: &mut Matrix) {
        for &group in &self.unlocked_groups {
            release_group(group, matrix);
        }
    }

    pub fn is_modifier_active(&self, at: CellRef) -> bool {
        self.active_modifiers.contains(&at)
    }

    /// Mark a modifier cell as activated; false if it already was
    pub fn activate_modifier(&mut self, at: CellRef) -> bool {
        self.active_modifiers.insert(at)
    }

    /// Re-arm modifier cells whose centre is farther than `radius` from `player_center`
    pub fn rearm_distant(&mut self, player_center: Vec2, radius: f32, matrix: &Matrix) -> Vec<CellRef> {
        let mut rearmed = Vec::new();
        self.active_modifiers.retain(|at| {
            let keep = matrix.wrapped_distance(player_center, at.center()) <= radius;
            if !keep {
                rearmed.push(*at);
            }
            keep
        });
        rearmed
    }

    pub fn active_modifiers(&self) -> impl Iterator<Item = CellRef> + '_ {
        self.active_modifiers.iter().copied()
    }

    pub fn clear_modifiers(&mut self) {
        self.active_modifiers.clear();
    }

    /// Forget all unlocks and activations
    pub fn clear(&mut self) {
        self.unlocked_groups.clear();
        self.active_modifiers.clear();
    }
}

fn release_group(group: u32, matrix: &mut Matrix) -> usize {
    let mut released = 0;
    for (_, cell) in matrix.iter_mut() {
        if cell.group == group && cell.lock == Lock::LockedOff {
            cell.lock = Lock::None;
            released += 1;
        }
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::parse_level_json;

    fn level() -> Matrix {
        parse_level_json(
            r#"[["T:1/G:7/LK:off", "T:2/G:7/LK:off", "T:1/G:3/LK:off"],
                ["T:3/G:7", 0, "M:20"]]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_unlock_releases_only_its_group() {
        let mut m = level();
        let mut groups = GroupRegistry::new();
        assert!(groups.unlock(7, &mut m));
        assert_eq!(m.get(0, 0).unwrap().lock, Lock::None);
        assert_eq!(m.get(1, 0).unwrap().lock, Lock::None);
        assert_eq!(m.get(2, 0).unwrap().lock, Lock::LockedOff);
        assert!(groups.is_unlocked(7));
        assert!(!groups.is_unlocked(3));
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let mut m = level();
        let mut groups = GroupRegistry::new();
        assert!(groups.unlock(7, &mut m));
        assert!(!groups.unlock(7, &mut m));
        assert!(!groups.unlock(0, &mut m));
        assert_eq!(groups.unlocked_groups().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_repeat_unlock_skips_sweep() {
        let mut m = level();
        let mut groups = GroupRegistry::new();
        assert!(groups.unlock(7, &mut m));

        // A cell relocked behind the registry's back stays locked on re-entry
        m.cell_mut(CellRef::new(0, 0)).unwrap().lock = Lock::LockedOff;
        assert!(!groups.unlock(7, &mut m));
        assert_eq!(m.get(0, 0).unwrap().lock, Lock::LockedOff);

        groups.reapply(&mut m);
        assert_eq!(m.get(0, 0).unwrap().lock, Lock::None);
    }

    #[test]
    fn test_reapply_to_replacement_matrix() {
        let mut m = level();
        let mut groups = GroupRegistry::new();
        groups.unlock(3, &mut m);

        let mut fresh = level();
        groups.reapply(&mut fresh);
        assert_eq!(fresh.get(2, 0).unwrap().lock, Lock::None);
        assert_eq!(fresh.get(0, 0).unwrap().lock, Lock::LockedOff);
    }

    #[test]
    fn test_modifier_activation_and_rearm() {
        let m = level();
        let mut groups = GroupRegistry::new();
        let at = CellRef::new(1, 2);
        assert!(groups.activate_modifier(at));
        assert!(!groups.activate_modifier(at));

        // Still within 1.5 blocks
        let near = Vec2::new(1.5, 1.5);
        assert!(groups.rearm_distant(near, 1.5, &m).is_empty());
        assert!(groups.is_modifier_active(at));

        // Wraparound: column 0 is adjacent to column 2 in a 3-wide level
        let wrapped = Vec2::new(0.5, 1.5);
        assert!(groups.rearm_distant(wrapped, 1.5, &m).is_empty());

        let far = Vec2::new(1.0, -3.0);
        assert_eq!(groups.rearm_distant(far, 1.5, &m), vec![at]);
        assert!(!groups.is_modifier_active(at));
    }
}
