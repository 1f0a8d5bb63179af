mod common;

use factory_deploy::domain::errors::FundingError;
use factory_deploy::domain::models::AccountRole;
use factory_deploy::services::FundingEqualizer;

use common::{address_of, session, setup_test_logging, FakeChain};

const TARGET: u128 = 5_000_000;

#[tokio::test]
async fn test_equalize_tops_up_every_account() {
    setup_test_logging();
    let chain = FakeChain::funded(1_000_000_000);
    let treasury = address_of(AccountRole::Treasury);
    let agent1 = address_of(AccountRole::Agent(1));
    chain.set_balance(&treasury, 2_000_000);
    chain.set_balance(&agent1, 7_000_000);
    let session = session(&chain);

    let result = FundingEqualizer::new(TARGET).equalize(&session).await.unwrap();

    assert_eq!(result.balances.len(), session.accounts().len());
    let treasury_transfer = result
        .transfers
        .iter()
        .find(|t| t.role == AccountRole::Treasury)
        .expect("treasury funded");
    assert_eq!(treasury_transfer.amount, 3_000_000);
    assert!(result.transfers.iter().all(|t| t.role != AccountRole::Agent(1)));
    assert!(result.transfers.iter().all(|t| t.role != AccountRole::Deployer));

    for (role, address) in session.accounts().iter() {
        if role != AccountRole::Deployer {
            assert!(chain.balance_of(address) >= TARGET, "{role} below target");
        }
    }
    assert_eq!(chain.balance_of(&agent1), 7_000_000);
}

#[tokio::test]
async fn test_equalize_is_noop_when_funded() {
    let chain = FakeChain::funded(1_000_000_000);
    let session = session(&chain);
    let equalizer = FundingEqualizer::new(TARGET);

    let first = equalizer.equalize(&session).await.unwrap();
    assert_eq!(first.transfers.len(), session.accounts().len() - 1);

    let second = equalizer.equalize(&session).await.unwrap();
    assert!(second.transfers.is_empty());
    assert_eq!(chain.transfers().len(), first.transfers.len());
}

#[tokio::test]
async fn test_insufficient_deployer_sends_nothing() {
    let chain = FakeChain::funded(1_000);
    let session = session(&chain);

    let err = FundingEqualizer::new(TARGET)
        .equalize(&session)
        .await
        .unwrap_err();

    match err {
        FundingError::InsufficientDeployerFunds {
            balance,
            required,
            denom,
        } => {
            assert_eq!(balance, 1_000);
            assert_eq!(required, TARGET * (session.accounts().len() as u128 - 1));
            assert_eq!(denom, "ujunox");
        }
        other => panic!("expected insufficient funds, got {other:?}"),
    }
    assert!(chain.transfers().is_empty());
}

#[tokio::test]
async fn test_read_balances_lists_accounts_in_role_order() {
    let chain = FakeChain::funded(42);
    let session = session(&chain);

    let balances = FundingEqualizer::new(TARGET)
        .read_balances(&session)
        .await
        .unwrap();

    assert_eq!(balances[0].role, AccountRole::Deployer);
    assert_eq!(balances[0].balance, 42);
    assert_eq!(balances[1].role, AccountRole::Treasury);
    assert!(balances[1..].iter().all(|b| b.balance == 0));
}
