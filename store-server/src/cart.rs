//! Cart Store
//!
//! Holds pre-checkout line items for a guest or authenticated shopper.
//! Adding an already-present product merges into the existing line; a
//! merged quantity of zero or less removes the line. Carts are deactivated
//! (never deleted) when they convert to an order or are merged away.
//!
//! `check_availability` is advisory: the order engine performs its own
//! authoritative check inside `create`, since cart and checkout may be
//! separated in time.

use crate::audit::{AuditAction, AuditService};
use crate::catalog::{Catalog, CatalogError};
use crate::orders::engine::{OrderEngine, OrderError};
use crate::storage::{CartStore, StorageError};
use rust_decimal::Decimal;
use serde_json::json;
use shared::models::{
    AvailabilityIssue, Cart, CartIssue, CartItem, CartOwner, CheckoutData, CreateOrderRequest,
    NewOrderItem, Order,
};
use shared::util::now_millis;
use std::sync::Arc;
use thiserror::Error;

/// Cart service errors
#[derive(Debug, Error)]
pub enum CartError {
    #[error("cart not found: {0}")]
    CartNotFound(String),

    #[error("cart {0} is not active")]
    CartInactive(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Outcome of a checkout attempt
#[derive(Debug)]
pub enum CheckoutResult {
    /// Order was created and the cart deactivated
    Placed(Order),
    /// Nothing was mutated; the listed lines block checkout
    Unavailable(Vec<AvailabilityIssue>),
}

/// Cart service
pub struct CartService {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn Catalog>,
    engine: Arc<OrderEngine>,
    audit: Arc<AuditService>,
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService").finish_non_exhaustive()
    }
}

impl CartService {
    pub fn new(
        carts: Arc<dyn CartStore>,
        catalog: Arc<dyn Catalog>,
        engine: Arc<OrderEngine>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            carts,
            catalog,
            engine,
            audit,
        }
    }

    /// The single active cart for an owner, created on first use
    pub async fn get_or_create(&self, owner: &CartOwner) -> Result<Cart, CartError> {
        if let Some(cart) = self.carts.active_for_owner(owner).await? {
            return Ok(cart);
        }

        let now = now_millis();
        let cart = Cart {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.clone(),
            is_active: true,
            items: vec![],
            created_at: now,
            updated_at: now,
        };
        match self.carts.insert(cart.clone()).await {
            Ok(()) => Ok(cart),
            // Lost a creation race; the winner's cart is the active one.
            Err(StorageError::Duplicate(_)) => self
                .carts
                .active_for_owner(owner)
                .await?
                .ok_or_else(|| CartError::CartNotFound(owner.key())),
            Err(e) => Err(e.into()),
        }
    }

    /// Add quantity of a product, merging into an existing line. The unit
    /// price is captured at add-time. A negative quantity decreases the
    /// line; at zero or below the line is removed.
    pub async fn add_item(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<Cart, CartError> {
        if unit_price < Decimal::ZERO {
            return Err(CartError::Validation(
                "unit price must be non-negative".into(),
            ));
        }

        let mut cart = self.load_active(cart_id).await?;
        match cart.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(line) => {
                line.quantity += quantity;
                if line.quantity <= 0 {
                    cart.items.retain(|i| i.product_id != product_id);
                }
            }
            None => {
                if quantity <= 0 {
                    return Err(CartError::Validation(format!(
                        "quantity must be positive for a new line, got {quantity}"
                    )));
                }
                let product = self
                    .catalog
                    .product(product_id)
                    .await?
                    .ok_or_else(|| CartError::Validation(format!("unknown product {product_id}")))?;
                cart.items.push(CartItem {
                    product_id: product_id.to_string(),
                    name: product.name,
                    unit_price,
                    quantity,
                });
            }
        }
        cart.updated_at = now_millis();
        self.carts.update(cart.clone()).await?;
        Ok(cart)
    }

    /// Set a line's quantity directly; zero or below removes the line
    pub async fn update_item(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> Result<Cart, CartError> {
        let mut cart = self.load_active(cart_id).await?;
        let Some(line) = cart.items.iter_mut().find(|i| i.product_id == product_id) else {
            return Err(CartError::Validation(format!(
                "product {product_id} is not in the cart"
            )));
        };
        if quantity <= 0 {
            cart.items.retain(|i| i.product_id != product_id);
        } else {
            line.quantity = quantity;
        }
        cart.updated_at = now_millis();
        self.carts.update(cart.clone()).await?;
        Ok(cart)
    }

    /// Remove a line entirely
    pub async fn remove_item(&self, cart_id: &str, product_id: &str) -> Result<Cart, CartError> {
        self.update_item(cart_id, product_id, 0).await
    }

    /// Advisory pre-checkout check: sellable and in stock for every line
    pub async fn check_availability(
        &self,
        cart_id: &str,
    ) -> Result<Vec<AvailabilityIssue>, CartError> {
        let cart = self.load(cart_id).await?;
        let mut issues = Vec::new();
        for line in &cart.items {
            let issue = match self.catalog.product(&line.product_id).await? {
                None => Some(CartIssue::ProductMissing),
                Some(p) if !p.is_active => Some(CartIssue::NotSellable),
                Some(p) if p.stock_quantity < i64::from(line.quantity) => {
                    Some(CartIssue::InsufficientStock {
                        requested: line.quantity,
                        available: p.stock_quantity,
                    })
                }
                Some(_) => None,
            };
            if let Some(issue) = issue {
                issues.push(AvailabilityIssue {
                    product_id: line.product_id.clone(),
                    issue,
                });
            }
        }
        Ok(issues)
    }

    /// Merge a guest cart into the user's cart (login flow).
    ///
    /// Every guest line is added with the same merge semantics as
    /// `add_item`, then the guest cart is deactivated. Merging an
    /// already-merged (inactive) cart is a no-op, so redelivery of the
    /// login event is harmless.
    pub async fn merge_carts(&self, guest_cart_id: &str, user_id: &str) -> Result<Cart, CartError> {
        let owner = CartOwner::User(user_id.to_string());
        let guest_cart = self
            .carts
            .get(guest_cart_id)
            .await?
            .ok_or_else(|| CartError::CartNotFound(guest_cart_id.to_string()))?;

        if !guest_cart.is_active {
            return self.get_or_create(&owner).await;
        }
        if !matches!(guest_cart.owner, CartOwner::Guest(_)) {
            return Err(CartError::Validation(format!(
                "cart {guest_cart_id} is not a guest cart"
            )));
        }

        let mut user_cart = self.get_or_create(&owner).await?;
        for line in &guest_cart.items {
            match user_cart
                .items
                .iter_mut()
                .find(|i| i.product_id == line.product_id)
            {
                Some(existing) => existing.quantity += line.quantity,
                None => user_cart.items.push(line.clone()),
            }
        }
        user_cart.updated_at = now_millis();
        self.carts.update(user_cart.clone()).await?;

        let mut guest_cart = guest_cart;
        guest_cart.is_active = false;
        guest_cart.updated_at = now_millis();
        self.carts.update(guest_cart).await?;

        self.audit.log(
            AuditAction::CartsMerged,
            format!("user:{user_id}"),
            format!("guest cart {guest_cart_id} merged"),
            json!({"guest_cart_id": guest_cart_id, "user_cart_id": user_cart.id}),
        );
        tracing::info!(user_id, guest_cart_id, "guest cart merged");
        Ok(user_cart)
    }

    /// Convert the cart into an order.
    ///
    /// Runs the availability check first and returns the issues without
    /// mutating anything if any line fails. Otherwise delegates to the
    /// order engine; on success the cart is deactivated. If the engine
    /// rejects (a race invalidated availability between the check and the
    /// atomic create), the cart stays active and the failure is surfaced
    /// so the caller may retry.
    pub async fn convert_to_order(
        &self,
        cart_id: &str,
        checkout: CheckoutData,
    ) -> Result<CheckoutResult, CartError> {
        let cart = self.load_active(cart_id).await?;
        if cart.items.is_empty() {
            return Err(CartError::Validation("cart is empty".into()));
        }

        let issues = self.check_availability(cart_id).await?;
        if !issues.is_empty() {
            return Ok(CheckoutResult::Unavailable(issues));
        }

        let request = CreateOrderRequest {
            user_id: cart.owner.user_id().map(str::to_string),
            items: cart
                .items
                .iter()
                .map(|i| NewOrderItem {
                    product_id: i.product_id.clone(),
                    quantity: i.quantity,
                })
                .collect(),
            shipping_address: checkout.shipping_address,
            billing_address: checkout.billing_address,
            payment_method: checkout.payment_method,
            discount_amount: Decimal::ZERO,
            note: checkout.note,
        };

        let order = self.engine.create(request).await?;

        let mut cart = cart;
        cart.is_active = false;
        cart.updated_at = now_millis();
        self.carts.update(cart).await?;

        self.audit.log(
            AuditAction::CartConverted,
            order
                .user_id
                .as_deref()
                .map_or_else(|| "guest".to_string(), |id| format!("user:{id}")),
            format!("cart {cart_id} converted to order {}", order.order_number),
            json!({"cart_id": cart_id, "order_id": order.id}),
        );
        Ok(CheckoutResult::Placed(order))
    }

    /// Read accessor for the admin layer
    pub async fn get(&self, cart_id: &str) -> Result<Option<Cart>, CartError> {
        Ok(self.carts.get(cart_id).await?)
    }

    async fn load(&self, cart_id: &str) -> Result<Cart, CartError> {
        self.carts
            .get(cart_id)
            .await?
            .ok_or_else(|| CartError::CartNotFound(cart_id.to_string()))
    }

    async fn load_active(&self, cart_id: &str) -> Result<Cart, CartError> {
        let cart = self.load(cart_id).await?;
        if !cart.is_active {
            return Err(CartError::CartInactive(cart_id.to_string()));
        }
        Ok(cart)
    }
}
