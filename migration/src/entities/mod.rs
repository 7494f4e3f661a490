pub mod chapter;
pub mod comic;
pub mod ranking_snapshot;
pub mod rating;
pub mod view_event;
pub mod view_statistics_snapshot;

pub use chapter::Entity as ChapterEntity;
pub use comic::Entity as ComicEntity;
pub use ranking_snapshot::Entity as RankingSnapshotEntity;
pub use rating::Entity as RatingEntity;
pub use view_event::Entity as ViewEventEntity;
pub use view_statistics_snapshot::Entity as ViewStatisticsSnapshotEntity;
