use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(big_integer(Accounts::Id).primary_key()) // telegram user id
                    .col(string(Accounts::Name))
                    .col(string_null(Accounts::WalletAddress))
                    .col(big_integer(Accounts::Coins).default(0))
                    .col(big_integer(Accounts::SpinTokens).default(0))
                    .col(big_integer(Accounts::AdCredit).default(0)) // 10^-4 units
                    .col(big_integer_null(Accounts::ReferredBy))
                    .col(integer(Accounts::ReferralCount).default(0))
                    .col(big_integer(Accounts::ReferralEarnings).default(0))
                    .col(big_integer(Accounts::TotalReferralEarnings).default(0))
                    .col(integer(Accounts::AdsWatchedToday).default(0))
                    .col(integer(Accounts::TasksCompletedTodayForSpin).default(0))
                    .col(integer(Accounts::FriendsInvitedTodayForSpin).default(0))
                    .col(integer(Accounts::TotalGameTasksCompleted).default(0))
                    .col(integer(Accounts::TotalSocialTasksCompleted).default(0))
                    .col(integer(Accounts::TotalPartnerTasksCompleted).default(0))
                    .col(timestamp_with_time_zone(Accounts::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(integer(Transactions::Id).primary_key())
                    .col(big_integer(Transactions::AccountId))
                    .col(string(Transactions::Amount)) // Decimal
                    .col(string(Transactions::Currency))
                    .col(string(Transactions::Kind))
                    .col(string(Transactions::Status))
                    .col(string_null(Transactions::ExternalRef))
                    .col(string_null(Transactions::ChainAmount)) // Decimal
                    .col(big_integer_null(Transactions::ReservedCoins))
                    .col(string(Transactions::Description))
                    .col(string_null(Transactions::Note))
                    .col(timestamp_with_time_zone_null(Transactions::ApprovedAt))
                    .col(timestamp_with_time_zone_null(Transactions::PayoutStartedAt))
                    .col(timestamp_with_time_zone(Transactions::CreatedAt))
                    .col(timestamp_with_time_zone(Transactions::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A failed transaction releases its reference for reuse.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_live_external_ref \
                 ON transactions (external_ref) \
                 WHERE external_ref IS NOT NULL AND status <> 'FAILED'",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_status_kind")
                    .table(Transactions::Table)
                    .col(Transactions::Status)
                    .col(Transactions::Kind)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(integer(Campaigns::Id).primary_key())
                    .col(big_integer(Campaigns::CreatorId))
                    .col(string(Campaigns::Link))
                    .col(integer(Campaigns::Goal))
                    .col(string(Campaigns::Cost)) // Decimal
                    .col(integer(Campaigns::Completions).default(0))
                    .col(string(Campaigns::Category))
                    .col(boolean(Campaigns::RequiresSubscriptionCheck).default(false))
                    .col(integer_null(Campaigns::RequiredLevel))
                    .col(string_null(Campaigns::WebhookToken).unique_key())
                    .col(timestamp_with_time_zone(Campaigns::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CampaignCompletions::Table)
                    .if_not_exists()
                    .col(big_integer(CampaignCompletions::AccountId))
                    .col(big_integer(CampaignCompletions::CampaignId))
                    .col(timestamp_with_time_zone(CampaignCompletions::StartedAt))
                    .col(timestamp_with_time_zone_null(CampaignCompletions::CompletedAt))
                    .index(
                        Index::create()
                            .col(CampaignCompletions::AccountId)
                            .col(CampaignCompletions::CampaignId)
                            .primary(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CampaignCompletions::Table, CampaignCompletions::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LevelCompletions::Table)
                    .if_not_exists()
                    .col(big_integer(LevelCompletions::AccountId))
                    .col(big_integer(LevelCompletions::CampaignId))
                    .col(integer(LevelCompletions::RequiredLevel))
                    .col(timestamp_with_time_zone(LevelCompletions::CompletedAt))
                    .index(
                        Index::create()
                            .col(LevelCompletions::AccountId)
                            .col(LevelCompletions::CampaignId)
                            .primary(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GameProgress::Table)
                    .if_not_exists()
                    .col(big_integer(GameProgress::AccountId))
                    .col(string(GameProgress::GameId))
                    .col(integer(GameProgress::CurrentLevel))
                    .col(integer(GameProgress::MaxLevelReached))
                    .col(timestamp_with_time_zone(GameProgress::UpdatedAt))
                    .index(
                        Index::create()
                            .col(GameProgress::AccountId)
                            .col(GameProgress::GameId)
                            .primary(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Referrals::Table)
                    .if_not_exists()
                    .col(integer(Referrals::Id).primary_key())
                    .col(big_integer(Referrals::ReferrerId))
                    .col(big_integer(Referrals::ReferredId).unique_key()) // referred once
                    .col(big_integer(Referrals::EarningsGenerated).default(0))
                    .col(timestamp_with_time_zone(Referrals::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DailyTasks::Table)
                    .if_not_exists()
                    .col(integer(DailyTasks::Id).primary_key())
                    .col(string(DailyTasks::Title))
                    .col(string(DailyTasks::TaskType))
                    .col(big_integer(DailyTasks::Reward))
                    .col(integer(DailyTasks::Completions).default(0))
                    .col(boolean(DailyTasks::IsActive).default(true))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DailyTaskCompletions::Table)
                    .if_not_exists()
                    .col(big_integer(DailyTaskCompletions::AccountId))
                    .col(big_integer(DailyTaskCompletions::TaskId))
                    .col(string(DailyTaskCompletions::Day)) // YYYY-MM-DD
                    .col(timestamp_with_time_zone(DailyTaskCompletions::StartedAt))
                    .col(timestamp_with_time_zone_null(DailyTaskCompletions::CompletedAt))
                    .col(boolean(DailyTaskCompletions::Claimed).default(false))
                    .index(
                        Index::create()
                            .col(DailyTaskCompletions::AccountId)
                            .col(DailyTaskCompletions::TaskId)
                            .col(DailyTaskCompletions::Day)
                            .primary(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(DailyTaskCompletions::Table, DailyTaskCompletions::TaskId)
                            .to(DailyTasks::Table, DailyTasks::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Quests::Table)
                    .if_not_exists()
                    .col(string(Quests::Id).primary_key())
                    .col(string(Quests::Title))
                    .col(big_integer(Quests::Reward))
                    .col(integer(Quests::TotalProgress))
                    .col(string(Quests::QuestType))
                    .col(boolean(Quests::IsActive).default(true))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuestProgress::Table)
                    .if_not_exists()
                    .col(big_integer(QuestProgress::AccountId))
                    .col(string(QuestProgress::QuestId))
                    .col(integer(QuestProgress::CurrentProgress).default(0))
                    .col(boolean(QuestProgress::IsCompleted).default(false))
                    .col(timestamp_with_time_zone(QuestProgress::UpdatedAt))
                    .index(
                        Index::create()
                            .col(QuestProgress::AccountId)
                            .col(QuestProgress::QuestId)
                            .primary(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ClaimedQuests::Table)
                    .if_not_exists()
                    .col(big_integer(ClaimedQuests::AccountId))
                    .col(string(ClaimedQuests::QuestId))
                    .col(big_integer(ClaimedQuests::RewardReceived))
                    .col(timestamp_with_time_zone(ClaimedQuests::ClaimedAt))
                    .index(
                        Index::create()
                            .col(ClaimedQuests::AccountId)
                            .col(ClaimedQuests::QuestId)
                            .primary(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SpinHistory::Table)
                    .if_not_exists()
                    .col(integer(SpinHistory::Id).primary_key())
                    .col(big_integer(SpinHistory::AccountId))
                    .col(string(SpinHistory::PrizeLabel))
                    .col(string(SpinHistory::PrizeType))
                    .col(string(SpinHistory::PrizeValue)) // Decimal
                    .col(timestamp_with_time_zone(SpinHistory::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(SpinHistory::Table, SpinHistory::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SpinHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClaimedQuests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QuestProgress::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Quests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DailyTaskCompletions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DailyTasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Referrals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GameProgress::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LevelCompletions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CampaignCompletions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Name,
    WalletAddress,
    Coins,
    SpinTokens,
    AdCredit,
    ReferredBy,
    ReferralCount,
    ReferralEarnings,      // unclaimed commission
    TotalReferralEarnings, // lifetime commission
    AdsWatchedToday,
    TasksCompletedTodayForSpin,
    FriendsInvitedTodayForSpin,
    TotalGameTasksCompleted,
    TotalSocialTasksCompleted,
    TotalPartnerTasksCompleted,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    AccountId,
    Amount, // signed, negative for withdrawals
    Currency,
    Kind,
    Status,
    ExternalRef, // chain tx hash, deposit reference, payout hash
    ChainAmount, // amount observed or sent on chain
    ReservedCoins,
    Description,
    Note,
    ApprovedAt,
    PayoutStartedAt, // set once a worker claims the payout, before sending
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Campaigns {
    Table,
    Id,
    CreatorId,
    Link,
    Goal,
    Cost,
    Completions,
    Category,
    RequiresSubscriptionCheck,
    RequiredLevel,
    WebhookToken,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CampaignCompletions {
    Table,
    AccountId,
    CampaignId,
    StartedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum LevelCompletions {
    Table,
    AccountId,
    CampaignId,
    RequiredLevel,
    CompletedAt,
}

#[derive(DeriveIden)]
enum GameProgress {
    Table,
    AccountId,
    GameId,
    CurrentLevel,
    MaxLevelReached,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Referrals {
    Table,
    Id,
    ReferrerId,
    ReferredId,
    EarningsGenerated,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DailyTasks {
    Table,
    Id,
    Title,
    TaskType,
    Reward,
    Completions,
    IsActive,
}

#[derive(DeriveIden)]
enum DailyTaskCompletions {
    Table,
    AccountId,
    TaskId,
    Day,
    StartedAt,
    CompletedAt,
    Claimed,
}

#[derive(DeriveIden)]
enum Quests {
    Table,
    Id,
    Title,
    Reward,
    TotalProgress,
    QuestType,
    IsActive,
}

#[derive(DeriveIden)]
enum QuestProgress {
    Table,
    AccountId,
    QuestId,
    CurrentProgress,
    IsCompleted,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ClaimedQuests {
    Table,
    AccountId,
    QuestId,
    RewardReceived,
    ClaimedAt,
}

#[derive(DeriveIden)]
enum SpinHistory {
    Table,
    Id,
    AccountId,
    PrizeLabel,
    PrizeType,
    PrizeValue,
    CreatedAt,
}
