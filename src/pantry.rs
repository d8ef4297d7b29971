//! Wallet and food inventory shared by the shop, the HUD and the pet.
//!
//! Nothing touches disk until the player opts in; with consent off the
//! pantry lives in memory only.

use crate::bus::{Bus, Notice, SubscriptionId, Topic};
use crate::storage::{PantrySave, SaveStore, SAVE_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub(crate) const COIN_VALUE: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Item {
    DriedFish,
    CheapFishCan,
    PremiumFishCan,
    Catnip,
    ToyBallFelt,
}

impl Item {
    pub(crate) const ALL: [Item; 5] = [
        Item::DriedFish,
        Item::CheapFishCan,
        Item::PremiumFishCan,
        Item::Catnip,
        Item::ToyBallFelt,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Item::DriedFish => "dried fish",
            Item::CheapFishCan => "cheap fish can",
            Item::PremiumFishCan => "premium fish can",
            Item::Catnip => "catnip",
            Item::ToyBallFelt => "felt toy ball",
        }
    }

    pub(crate) fn price(self) -> u64 {
        match self {
            Item::DriedFish => 50,
            Item::CheapFishCan => 75,
            Item::PremiumFishCan => 140,
            Item::Catnip => 40,
            Item::ToyBallFelt => 200,
        }
    }

    /// Can only be owned once.
    pub(crate) fn one_time(self) -> bool {
        matches!(self, Item::ToyBallFelt)
    }

    /// Stamina restored when fed to the pet; `None` for non-food.
    pub(crate) fn stamina(self) -> Option<i32> {
        match self {
            Item::DriedFish => Some(15),
            Item::CheapFishCan => Some(30),
            Item::PremiumFishCan => Some(60),
            Item::Catnip => Some(5),
            Item::ToyBallFelt => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Purchase {
    Bought,
    TooPoor,
    AlreadyOwned,
}

pub(crate) struct Pantry {
    money: u64,
    items: BTreeMap<Item, u32>,
    consent: bool,
    store: Option<SaveStore>,
    subscription: SubscriptionId,
}

impl Pantry {
    /// `store: None` keeps everything in memory.
    pub(crate) fn open(store: Option<SaveStore>, bus: &mut Bus) -> Self {
        let mut pantry = Self {
            money: 0,
            items: BTreeMap::new(),
            consent: false,
            store,
            subscription: bus.subscribe(&[Topic::Consent, Topic::Storage]),
        };
        pantry.consent = pantry.read_consent();
        if pantry.consent {
            pantry.adopt_saved();
        }
        pantry
    }

    pub(crate) fn money(&self) -> u64 {
        self.money
    }

    pub(crate) fn count(&self, item: Item) -> u32 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    pub(crate) fn consent(&self) -> bool {
        self.consent
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.money == 0 && self.items.values().all(|&n| n == 0)
    }

    pub(crate) fn collect_coin(&mut self, bus: &mut Bus) {
        self.money = self.money.saturating_add(COIN_VALUE);
        bus.publish(Notice::MoneyChanged { money: self.money });
        self.persist();
    }

    pub(crate) fn buy(&mut self, item: Item, bus: &mut Bus) -> Purchase {
        if item.one_time() && self.count(item) > 0 {
            return Purchase::AlreadyOwned;
        }
        if self.money < item.price() {
            return Purchase::TooPoor;
        }
        self.money -= item.price();
        *self.items.entry(item).or_insert(0) += 1;
        bus.publish(Notice::MoneyChanged { money: self.money });
        bus.publish(Notice::InventoryChanged);
        self.persist();
        info!(item = item.name(), money = self.money, "bought");
        Purchase::Bought
    }

    /// Consume one food item and announce the feeding. False when there is
    /// nothing edible of that kind.
    pub(crate) fn feed(&mut self, item: Item, bus: &mut Bus) -> bool {
        let Some(amount) = item.stamina() else {
            return false;
        };
        match self.items.get_mut(&item) {
            Some(n) if *n > 0 => *n -= 1,
            _ => return false,
        }
        bus.publish(Notice::FeedPerformed { amount });
        bus.publish(Notice::InventoryChanged);
        self.persist();
        true
    }

    /// First food in the inventory, cheapest kind first.
    pub(crate) fn any_food(&self) -> Option<Item> {
        Item::ALL
            .into_iter()
            .filter(|i| i.stamina().is_some() && self.count(*i) > 0)
            .min_by_key(|i| i.price())
    }

    /// Apply consent/clear notices published by the settings menu.
    pub(crate) fn pump(&mut self, bus: &mut Bus) {
        for notice in bus.drain(self.subscription) {
            match notice {
                Notice::ConsentChanged { enabled } => self.set_consent(enabled),
                Notice::StorageCleared => self.clear_saved(),
                _ => {}
            }
        }
    }

    fn set_consent(&mut self, enabled: bool) {
        if enabled == self.consent {
            return;
        }
        self.consent = enabled;
        if let Some(store) = &self.store {
            if let Err(e) = store.write_consent(enabled) {
                warn!(error = %e, "could not remember save preference");
            }
        }
        if enabled {
            if self.is_empty() {
                self.adopt_saved();
            }
            self.persist();
        }
        info!(enabled, "save consent changed");
    }

    /// Wipes what is on disk; the in-memory pantry stays.
    fn clear_saved(&mut self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                warn!(error = %e, "could not clear saved data");
            }
        }
        info!("saved data cleared");
    }

    fn read_consent(&self) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        store.read_consent().unwrap_or_else(|e| {
            warn!(error = %e, "save preference unreadable");
            false
        })
    }

    fn adopt_saved(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        match store.load_pantry() {
            Ok(Some(save)) => {
                self.money = save.money;
                self.items = save.items;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "saved pantry unreadable, starting empty"),
        }
    }

    fn persist(&self) {
        if !self.consent {
            return;
        }
        let Some(store) = &self.store else {
            return;
        };
        let save = PantrySave {
            version: SAVE_VERSION,
            saved_at: chrono::Utc::now(),
            money: self.money,
            items: self.items.clone(),
        };
        if let Err(e) = store.save_pantry(&save) {
            warn!(error = %e, "pantry not saved, keeping it in memory");
        }
    }
}
