use focusflow_shared::TaskDto;

/// Counts shown in the progress panel. Recomputed from the snapshot on every read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivedStats {
    pub completed: usize,
    pub pending: usize,
    pub completion_percentage: u8,
}

impl DerivedStats {
    pub fn from_tasks(tasks: &[TaskDto]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.status).count();
        let completion_percentage = if total == 0 {
            0
        } else {
            // round half up, integer only
            ((completed * 200 + total) / (total * 2)) as u8
        };

        Self {
            completed,
            pending: total - completed,
            completion_percentage,
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64, status: bool) -> TaskDto {
        TaskDto {
            id,
            title: format!("task {id}"),
            status,
            remarks: None,
        }
    }

    #[test]
    fn empty_snapshot_is_zero_percent() {
        assert_eq!(DerivedStats::from_tasks(&[]), DerivedStats::default());
    }

    #[test]
    fn one_of_two_done_is_fifty() {
        let tasks = vec![
            TaskDto {
                id: 1,
                title: "Buy milk".to_string(),
                status: false,
                remarks: None,
            },
            TaskDto {
                id: 2,
                title: "Ship release".to_string(),
                status: true,
                remarks: None,
            },
        ];
        let stats = DerivedStats::from_tasks(&tasks);
        assert_eq!(
            stats,
            DerivedStats {
                completed: 1,
                pending: 1,
                completion_percentage: 50,
            }
        );
        assert_eq!(stats.total(), 2);
    }

    #[test]
    fn percentage_matches_rounded_ratio() {
        for total in 1..=40u64 {
            for done in 0..=total {
                let tasks: Vec<_> = (0..total).map(|i| task(i, i < done)).collect();
                let expected = (100.0 * done as f64 / total as f64).round() as u8;
                assert_eq!(
                    DerivedStats::from_tasks(&tasks).completion_percentage,
                    expected,
                    "done={done} total={total}"
                );
            }
        }
    }

    #[test]
    fn thirds_round_to_nearest() {
        let tasks = vec![task(1, true), task(2, false), task(3, false)];
        assert_eq!(DerivedStats::from_tasks(&tasks).completion_percentage, 33);
        let tasks = vec![task(1, true), task(2, true), task(3, false)];
        assert_eq!(DerivedStats::from_tasks(&tasks).completion_percentage, 67);
    }
}
