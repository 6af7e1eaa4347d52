use async_trait::async_trait;

use crate::models::{Grade, Learner};

/// Read access to the two collections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn learners(&self) -> anyhow::Result<Vec<Learner>>;

    async fn grades(&self) -> anyhow::Result<Vec<Grade>>;

    async fn class_grades(&self, class_id: i32) -> anyhow::Result<Vec<Grade>>;
}

#[cfg(test)]
pub mod memory {
    use super::*;

    #[derive(Debug, Clone, Default)]
    pub struct MemoryStore {
        pub learners: Vec<Learner>,
        pub grades: Vec<Grade>,
        pub unavailable: bool,
    }

    impl MemoryStore {
        fn ensure_available(&self) -> anyhow::Result<()> {
            if self.unavailable {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RecordStore for MemoryStore {
        async fn learners(&self) -> anyhow::Result<Vec<Learner>> {
            self.ensure_available()?;
            Ok(self.learners.clone())
        }

        async fn grades(&self) -> anyhow::Result<Vec<Grade>> {
            self.ensure_available()?;
            Ok(self.grades.clone())
        }

        async fn class_grades(&self, class_id: i32) -> anyhow::Result<Vec<Grade>> {
            self.ensure_available()?;
            Ok(self
                .grades
                .iter()
                .filter(|grade| grade.class_id == Some(class_id))
                .cloned()
                .collect())
        }
    }
}
