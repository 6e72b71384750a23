//! Cart operations over the durable store.

use common::{CartIdentity, ProductId, SessionToken, UserId};
use domain::{Cart, CartStatus, CartSummary, Product};
use store::{CartStore, InventoryGate, ProductStore, StoreError};

use crate::error::{CartError, Result};

/// Attempts per mutation before giving up on version conflicts.
const MAX_WRITE_ATTEMPTS: usize = 5;

/// Service for identity-scoped cart operations.
///
/// Every mutation follows the same shape: load the open cart, validate the
/// product against the inventory gate, mutate a local copy, and write it
/// back through the store's version compare-and-swap. A conflict means
/// another request for the same identity won the write; the operation
/// reloads and reapplies rather than overwriting.
pub struct CartService<C, P>
where
    C: CartStore,
    P: ProductStore,
{
    carts: C,
    inventory: InventoryGate<P>,
}

impl<C, P> CartService<C, P>
where
    C: CartStore,
    P: ProductStore,
{
    /// Creates a new cart service.
    pub fn new(carts: C, inventory: InventoryGate<P>) -> Self {
        Self { carts, inventory }
    }

    /// Returns the identity's open cart, creating an empty one if none
    /// exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create(&self, identity: &CartIdentity) -> Result<Cart> {
        loop {
            if let Some(cart) = self.carts.find_open(identity).await? {
                return Ok(cart);
            }
            let cart = Cart::new(identity.clone());
            match self.carts.insert(&cart).await {
                Ok(()) => {
                    metrics::counter!("carts_created_total").increment(1);
                    return Ok(cart);
                }
                // Lost the creation race; the winner's cart is found on the
                // next loop iteration.
                Err(StoreError::DuplicateOpenCart { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Adds `quantity` units of a product to the identity's cart, merging
    /// into an existing line. The line's price snapshot refreshes to the
    /// current catalog price.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        identity: &CartIdentity,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut cart = self.get_or_create(identity).await?;
            require_modifiable(&cart)?;

            let product = self.active_product(product_id).await?;
            let desired = cart.line_quantity(product_id) + quantity;
            if !product.has_stock(desired) {
                return Err(insufficient_stock(&product, desired, &cart));
            }

            cart.add_line(&product, quantity);
            match self.write(cart).await? {
                Some(cart) => {
                    metrics::counter!("cart_mutations_total").increment(1);
                    return Ok(cart);
                }
                None => continue,
            }
        }
        Err(CartError::ConcurrencyExhausted)
    }

    /// Rewrites a line's quantity; `0` removes the line. Stock is
    /// revalidated and the price snapshot refreshed on every rewrite.
    #[tracing::instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        identity: &CartIdentity,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut cart = self.require_open(identity).await?;
            require_modifiable(&cart)?;

            if quantity == 0 {
                cart.remove_line(product_id);
            } else {
                let product = self
                    .inventory
                    .product(product_id)
                    .await?
                    .ok_or(CartError::ProductNotFound(product_id))?;
                if !product.has_stock(quantity) {
                    return Err(insufficient_stock(&product, quantity, &cart));
                }
                if !cart.set_line_quantity(&product, quantity) {
                    return Err(CartError::LineNotFound(product_id));
                }
            }

            match self.write(cart).await? {
                Some(cart) => {
                    metrics::counter!("cart_mutations_total").increment(1);
                    return Ok(cart);
                }
                None => continue,
            }
        }
        Err(CartError::ConcurrencyExhausted)
    }

    /// Removes a product's line. Removing an absent line is a no-op, but
    /// the identity must have an open cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        identity: &CartIdentity,
        product_id: ProductId,
    ) -> Result<Cart> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut cart = self.require_open(identity).await?;
            require_modifiable(&cart)?;

            if !cart.remove_line(product_id) {
                return Ok(cart);
            }
            match self.write(cart).await? {
                Some(cart) => {
                    metrics::counter!("cart_mutations_total").increment(1);
                    return Ok(cart);
                }
                None => continue,
            }
        }
        Err(CartError::ConcurrencyExhausted)
    }

    /// Empties the identity's cart and resets the total to zero.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, identity: &CartIdentity) -> Result<Cart> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut cart = self.require_open(identity).await?;
            require_modifiable(&cart)?;

            cart.clear();
            match self.write(cart).await? {
                Some(cart) => {
                    metrics::counter!("cart_mutations_total").increment(1);
                    return Ok(cart);
                }
                None => continue,
            }
        }
        Err(CartError::ConcurrencyExhausted)
    }

    /// Returns an item-count/total digest without creating a cart.
    #[tracing::instrument(skip(self))]
    pub async fn summary(&self, identity: &CartIdentity) -> Result<CartSummary> {
        Ok(self
            .carts
            .find_open(identity)
            .await?
            .map(|cart| cart.summary())
            .unwrap_or_else(CartSummary::empty))
    }

    /// Folds a guest session's cart into the user's on login.
    ///
    /// Matching product lines sum quantities, other lines append, and the
    /// guest cart is deleted. With no user cart yet, the guest cart is
    /// re-keyed to the user instead. Returns `None` (a silent no-op) when
    /// there is nothing to merge.
    #[tracing::instrument(skip(self))]
    pub async fn merge_guest_into_user(
        &self,
        session: &SessionToken,
        user: UserId,
    ) -> Result<Option<Cart>> {
        let guest_identity = CartIdentity::Session(session.clone());
        let user_identity = CartIdentity::User(user);

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(guest) = self.carts.find_open(&guest_identity).await? else {
                return Ok(None);
            };
            if guest.status != CartStatus::Active || guest.is_empty() {
                return Ok(None);
            }

            match self.carts.find_open(&user_identity).await? {
                None => {
                    let mut rekeyed = guest.clone();
                    rekeyed.identity = user_identity.clone();
                    match self.write(rekeyed).await? {
                        Some(cart) => {
                            metrics::counter!("cart_merges_total").increment(1);
                            return Ok(Some(cart));
                        }
                        None => continue,
                    }
                }
                Some(mut user_cart) => {
                    require_modifiable(&user_cart)?;
                    user_cart.merge_from(&guest);
                    match self.write(user_cart).await? {
                        Some(cart) => {
                            self.carts.delete(guest.id).await?;
                            metrics::counter!("cart_merges_total").increment(1);
                            return Ok(Some(cart));
                        }
                        None => continue,
                    }
                }
            }
        }
        Err(CartError::ConcurrencyExhausted)
    }

    /// Writes the cart back; `None` signals a lost version race the caller
    /// should retry.
    async fn write(&self, mut cart: Cart) -> Result<Option<Cart>> {
        match self.carts.update(&cart).await {
            Ok(version) => {
                cart.version = version;
                Ok(Some(cart))
            }
            Err(StoreError::VersionConflict { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn require_open(&self, identity: &CartIdentity) -> Result<Cart> {
        self.carts
            .find_open(identity)
            .await?
            .ok_or(CartError::CartNotFound)
    }

    async fn active_product(&self, product_id: ProductId) -> Result<Product> {
        let product = self
            .inventory
            .product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;
        if !product.active {
            return Err(CartError::ProductInactive(product_id));
        }
        Ok(product)
    }
}

fn require_modifiable(cart: &Cart) -> Result<()> {
    if cart.status.can_modify_items() {
        Ok(())
    } else {
        Err(CartError::NotModifiable {
            status: cart.status,
        })
    }
}

fn insufficient_stock(product: &Product, requested: u32, cart: &Cart) -> CartError {
    CartError::InsufficientStock {
        product_id: product.id,
        product_name: product.name.clone(),
        requested,
        available: product.stock,
        in_cart: cart.line_quantity(product.id),
    }
}
