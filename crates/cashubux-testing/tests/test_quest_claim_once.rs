use cashubux_entities::sea_orm_active_enums::QuestType;
use cashubux_ledger::{LedgerError, NewCampaignKind, NewQuest};
use cashubux_testing::TestFixture;
use rust_decimal::dec;

/// Test game quest → progress derived from completed game tasks, claimable once
///
/// Should test:
/// - Claiming below target fails with NotCompleted
/// - Completing enough game tasks makes the quest claimable
/// - Reward is credited once; a second claim fails with AlreadyClaimed
/// - Claimed and completed quests drop out of the listing
#[tokio::test]
async fn test_quest_claim_once() {
    let test = TestFixture::new().await;
    test.register(1, None).await;
    test.register(2, None).await;
    test.ledger
        .create_quest(NewQuest {
            id: "play2".to_string(),
            title: "Play two games".to_string(),
            reward: 10_000,
            total_progress: 2,
            quest_type: QuestType::Game,
        })
        .await
        .unwrap();

    assert!(matches!(
        test.ledger.claim_quest(2, "play2").await,
        Err(LedgerError::NotCompleted {
            current: 0,
            target: 2
        })
    ));

    for bot in ["game_one_bot", "game_two_bot"] {
        let campaign = test
            .create_campaign(1, NewCampaignKind::Game, &format!("@{bot}"), 10, dec!(1))
            .await;
        test.membership.start_bot(bot, 2);
        test.complete_task(2, &campaign).await;
    }

    let quests = test.ledger.list_quests(2).await.unwrap();
    assert_eq!(quests.len(), 1);
    assert!(quests[0].is_completed);
    assert!(!quests[0].is_claimed);

    let before = test.account(2).await.coins;
    let claim = test.ledger.claim_quest(2, "play2").await.unwrap();
    assert_eq!(claim.account.coins, before + 10_000);

    assert!(matches!(
        test.ledger.claim_quest(2, "play2").await,
        Err(LedgerError::AlreadyClaimed)
    ));
    assert!(test.ledger.list_quests(2).await.unwrap().is_empty());

    println!("✅ Quest reward paid exactly once");
}
