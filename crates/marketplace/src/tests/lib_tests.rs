use super::*;

use shared::domain::PaymentTerms;

fn registration(role: UserRole, username: &str) -> Registration {
    Registration {
        role,
        name: format!("{username} (test)"),
        contact: "9876543210".into(),
        location: "Nashik".into(),
        username: username.into(),
        password: "secret123".into(),
    }
}

fn wheat(quantity: f64) -> ProductInput {
    ProductInput {
        name: "Wheat".into(),
        quantity,
        price: 24.0,
        harvest_date: "2024-04-10".into(),
    }
}

fn proposal(counterparty: &str, product_id: ProductId, quantity: f64) -> ContractProposal {
    ContractProposal {
        counterparty: counterparty.into(),
        product_id,
        quantity,
        price: 22.5,
        delivery_date: "2024-06-30".into(),
        payment_terms: Some(PaymentTerms::HalfAdvance),
    }
}

/// A farmer session and a buyer session over one shared store.
async fn two_sessions(options: MarketOptions) -> (Marketplace, Marketplace) {
    let storage = Storage::in_memory().await.expect("db");
    let mut farmer = Marketplace::new(storage.clone(), options);
    let mut buyer = Marketplace::new(storage, options);

    farmer
        .register(&registration(UserRole::Farmer, "ravi"))
        .await
        .expect("register farmer");
    farmer
        .register(&registration(UserRole::Buyer, "meera"))
        .await
        .expect("register buyer");
    farmer
        .login("ravi", "secret123", UserRole::Farmer)
        .await
        .expect("farmer login");
    buyer
        .login("meera", "secret123", UserRole::Buyer)
        .await
        .expect("buyer login");
    (farmer, buyer)
}

#[tokio::test]
async fn register_then_login_starts_session() {
    let mut market = Marketplace::in_memory().await.expect("market");
    let profile = market
        .register(&registration(UserRole::Farmer, " ravi "))
        .await
        .expect("register");
    assert_eq!(profile.username, "ravi");
    assert_eq!(profile.registration_date, Local::now().date_naive());

    assert!(market.session().is_none());
    let session = market
        .login("ravi", "secret123", UserRole::Farmer)
        .await
        .expect("login");
    assert_eq!(session.name, profile.name);
    assert_eq!(session.user_id, profile.user_id);
    assert_eq!(market.session().map(|s| s.role), Some(UserRole::Farmer));

    assert!(market.logout().is_some());
    assert!(market.session().is_none());
}

#[tokio::test]
async fn duplicate_username_is_rejected_across_roles() {
    let market = Marketplace::in_memory().await.expect("market");
    market
        .register(&registration(UserRole::Farmer, "Ravi"))
        .await
        .expect("register");
    let err = market
        .register(&registration(UserRole::Buyer, "ravi"))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, MarketError::UsernameTaken));
}

#[tokio::test]
async fn registration_validation_runs_before_storage() {
    let market = Marketplace::in_memory().await.expect("market");
    let mut input = registration(UserRole::Buyer, "meera");
    input.contact = "12345".into();
    assert!(matches!(
        market.register(&input).await,
        Err(MarketError::InvalidContact)
    ));
    assert!(!market
        .storage()
        .username_taken("meera")
        .await
        .expect("lookup"));
}

#[tokio::test]
async fn login_requires_matching_role_and_password() {
    let mut market = Marketplace::in_memory().await.expect("market");
    market
        .register(&registration(UserRole::Farmer, "ravi"))
        .await
        .expect("register");

    assert!(matches!(
        market.login("", "secret123", UserRole::Farmer).await,
        Err(MarketError::MissingCredentials)
    ));
    assert!(matches!(
        market.login("ravi", "secret123", UserRole::Buyer).await,
        Err(MarketError::InvalidCredentials)
    ));
    assert!(matches!(
        market.login("ravi", "wrong-pass", UserRole::Farmer).await,
        Err(MarketError::InvalidCredentials)
    ));
    assert!(market.session().is_none());
}

#[tokio::test]
async fn operations_require_a_session() {
    let market = Marketplace::in_memory().await.expect("market");
    assert!(matches!(
        market.my_contracts().await,
        Err(MarketError::NotLoggedIn)
    ));
    assert!(matches!(
        market.add_product(&wheat(10.0)).await,
        Err(MarketError::NotLoggedIn)
    ));
}

#[tokio::test]
async fn farmer_manages_own_inventory() {
    let (farmer, buyer) = two_sessions(MarketOptions::default()).await;
    let product = farmer.add_product(&wheat(500.0)).await.expect("add");
    assert_eq!(product.name, "Wheat");
    assert_eq!(farmer.my_products().await.expect("list").len(), 1);

    assert!(matches!(
        buyer.add_product(&wheat(1.0)).await,
        Err(MarketError::WrongRole {
            required: UserRole::Farmer
        })
    ));

    farmer
        .remove_product(product.product_id)
        .await
        .expect("remove");
    assert!(farmer.my_products().await.expect("list").is_empty());
    assert!(matches!(
        farmer.remove_product(product.product_id).await,
        Err(MarketError::ProductNotFound(_))
    ));
}

#[tokio::test]
async fn find_buyers_offers_the_farmers_inventory_to_everyone() {
    let (farmer, _buyer) = two_sessions(MarketOptions::default()).await;
    farmer
        .register(&registration(UserRole::Buyer, "asha"))
        .await
        .expect("register");
    farmer.add_product(&wheat(100.0)).await.expect("add");

    let listings = farmer.find_buyers().await.expect("buyers");
    let usernames: Vec<_> = listings
        .iter()
        .map(|l| l.profile.username.as_str())
        .collect();
    assert_eq!(usernames, ["meera", "asha"]);
    assert!(listings.iter().all(|l| l.products.len() == 1));
}

#[tokio::test]
async fn find_farmers_lists_each_farmers_products() {
    let (farmer, buyer) = two_sessions(MarketOptions::default()).await;
    farmer
        .register(&registration(UserRole::Farmer, "anil"))
        .await
        .expect("register");
    farmer.add_product(&wheat(100.0)).await.expect("add");

    let listings = buyer.find_counterparties().await.expect("farmers");
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].profile.username, "ravi");
    assert_eq!(listings[0].products.len(), 1);
    assert!(listings[1].products.is_empty());

    assert!(matches!(
        buyer.find_buyers().await,
        Err(MarketError::WrongRole { .. })
    ));
}

#[tokio::test]
async fn buyer_keeps_an_interest_list() {
    let (farmer, buyer) = two_sessions(MarketOptions::default()).await;
    buyer.add_interest("Basmati rice").await.expect("interest");
    assert_eq!(buyer.interests().await.expect("list"), ["Basmati rice"]);
    assert!(farmer.interests().await.is_err());
    assert!(buyer.add_interest("   ").await.is_err());
}

#[tokio::test]
async fn farmer_proposes_from_own_inventory() {
    let (farmer, buyer) = two_sessions(MarketOptions::default()).await;
    let product = farmer.add_product(&wheat(200.0)).await.expect("add");

    let contract = farmer
        .propose_contract(&proposal("meera", product.product_id, 80.0))
        .await
        .expect("propose");
    assert_eq!(contract.contract_id, ContractId(1));
    assert_eq!(contract.farmer, "ravi");
    assert_eq!(contract.buyer, "meera");
    assert_eq!(contract.product, "Wheat");
    assert_eq!(contract.total_value, 1800.0);
    assert_eq!(contract.status, ContractStatus::Pending);

    // stock is not reserved by a proposal
    assert_eq!(farmer.my_products().await.expect("list")[0].quantity, 200.0);
    assert_eq!(buyer.my_contracts().await.expect("list").len(), 1);
}

#[tokio::test]
async fn buyer_proposes_against_the_farmers_inventory() {
    let (farmer, buyer) = two_sessions(MarketOptions::default()).await;
    let product = farmer.add_product(&wheat(50.0)).await.expect("add");

    let contract = buyer
        .propose_contract(&proposal("ravi", product.product_id, 50.0))
        .await
        .expect("propose");
    assert_eq!(contract.farmer, "ravi");
    assert_eq!(contract.buyer, "meera");
    assert_eq!(farmer.my_contracts().await.expect("list").len(), 1);
}

#[tokio::test]
async fn proposal_validation_failures() {
    let (farmer, _buyer) = two_sessions(MarketOptions::default()).await;
    let product = farmer.add_product(&wheat(50.0)).await.expect("add");

    let err = farmer
        .propose_contract(&proposal("meera", product.product_id, 51.0))
        .await
        .expect_err("over stock");
    assert_eq!(
        err.to_string(),
        "Invalid input: Quantity cannot exceed available 50.0 kg"
    );

    assert!(matches!(
        farmer
            .propose_contract(&proposal("ghost", product.product_id, 5.0))
            .await,
        Err(MarketError::CounterpartyNotFound { .. })
    ));

    // a farmer cannot contract with another farmer
    farmer
        .register(&registration(UserRole::Farmer, "anil"))
        .await
        .expect("register");
    assert!(matches!(
        farmer
            .propose_contract(&proposal("anil", product.product_id, 5.0))
            .await,
        Err(MarketError::CounterpartyNotFound { .. })
    ));

    let mut missing_terms = proposal("meera", product.product_id, 5.0);
    missing_terms.payment_terms = None;
    assert!(matches!(
        farmer.propose_contract(&missing_terms).await,
        Err(MarketError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn proposal_cannot_use_someone_elses_product() {
    let (farmer, buyer) = two_sessions(MarketOptions::default()).await;
    let product = farmer.add_product(&wheat(50.0)).await.expect("add");
    farmer
        .register(&registration(UserRole::Farmer, "anil"))
        .await
        .expect("register");

    // anil lists nothing, so ravi's product is not on offer from him
    assert!(matches!(
        buyer
            .propose_contract(&proposal("anil", product.product_id, 5.0))
            .await,
        Err(MarketError::NoProductsAvailable)
    ));
    assert!(matches!(
        buyer
            .propose_contract(&proposal("ravi", ProductId(product.product_id.0 + 1), 5.0))
            .await,
        Err(MarketError::ProductNotFound(_))
    ));
}

#[tokio::test]
async fn proposing_from_an_empty_inventory_is_refused() {
    let (farmer, _buyer) = two_sessions(MarketOptions::default()).await;
    let err = farmer
        .propose_contract(&proposal("meera", ProductId(1), 5.0))
        .await
        .expect_err("nothing to offer");
    assert_eq!(err.to_string(), "No products available for contract");
    assert_eq!(err.severity(), shared::error::Severity::Warning);
}

#[tokio::test]
async fn contract_details_are_visible_to_parties_only() {
    let (farmer, buyer) = two_sessions(MarketOptions::default()).await;
    let product = farmer.add_product(&wheat(50.0)).await.expect("add");
    let contract = farmer
        .propose_contract(&proposal("meera", product.product_id, 5.0))
        .await
        .expect("propose");

    let mut outsider = Marketplace::new(buyer.storage().clone(), MarketOptions::default());
    outsider
        .register(&registration(UserRole::Buyer, "asha"))
        .await
        .expect("register");
    outsider
        .login("asha", "secret123", UserRole::Buyer)
        .await
        .expect("login");

    assert!(buyer.contract_details(contract.contract_id).await.is_ok());
    assert!(matches!(
        outsider.contract_details(contract.contract_id).await,
        Err(MarketError::ContractNotFound(_))
    ));
    assert!(matches!(
        outsider.accept_contract(contract.contract_id).await,
        Err(MarketError::ContractNotFound(_))
    ));
}

#[tokio::test]
async fn roles_gate_status_actions() {
    let (farmer, buyer) = two_sessions(MarketOptions::default()).await;
    let product = farmer.add_product(&wheat(50.0)).await.expect("add");
    let id = farmer
        .propose_contract(&proposal("meera", product.product_id, 5.0))
        .await
        .expect("propose")
        .contract_id;

    assert!(matches!(
        farmer.accept_contract(id).await,
        Err(MarketError::NotPermitted {
            role: UserRole::Farmer,
            status: ContractStatus::Accepted
        })
    ));
    assert!(matches!(
        buyer.mark_delivered(id).await,
        Err(MarketError::NotPermitted { .. })
    ));
    assert!(matches!(
        buyer
            .update_contract_status(id, ContractStatus::Pending)
            .await,
        Err(MarketError::NotPermitted { .. })
    ));
}

#[tokio::test]
async fn enforced_lifecycle_rejects_skipped_steps() {
    let (farmer, buyer) = two_sessions(MarketOptions::default()).await;
    let product = farmer.add_product(&wheat(50.0)).await.expect("add");
    let id = farmer
        .propose_contract(&proposal("meera", product.product_id, 5.0))
        .await
        .expect("propose")
        .contract_id;

    assert!(matches!(
        buyer.make_payment(id).await,
        Err(MarketError::IllegalTransition {
            from: ContractStatus::Pending,
            to: ContractStatus::Paid,
            ..
        })
    ));
    assert!(matches!(
        farmer.mark_delivered(id).await,
        Err(MarketError::IllegalTransition { .. })
    ));

    buyer.reject_contract(id).await.expect("reject");
    assert!(matches!(
        buyer.accept_contract(id).await,
        Err(MarketError::IllegalTransition {
            from: ContractStatus::Rejected,
            ..
        })
    ));
}

#[tokio::test]
async fn permissive_mode_sets_any_status_directly() {
    let (farmer, buyer) = two_sessions(MarketOptions {
        enforce_transitions: false,
    })
    .await;
    let product = farmer.add_product(&wheat(50.0)).await.expect("add");
    let id = farmer
        .propose_contract(&proposal("meera", product.product_id, 5.0))
        .await
        .expect("propose")
        .contract_id;

    let paid = buyer.make_payment(id).await.expect("pay straight away");
    assert_eq!(paid.status, ContractStatus::Paid);
    let accepted = buyer.accept_contract(id).await.expect("back to accepted");
    assert_eq!(accepted.status, ContractStatus::Accepted);

    // roles still apply
    assert!(farmer.accept_contract(id).await.is_err());
}
