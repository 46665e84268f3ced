use std::cell::RefCell;
use std::rc::Rc;

use foundation::ids::OriginToken;
use runtime::{EventBus, Payload, PublishError};
use tracing::debug;

use crate::filter::{Dimension, FilterState};
use crate::point::{self, DataPoint};

/// Published after [`DataController::set_data`] replaced the dataset.
pub const DATA_DID_CHANGE: &str = "data-did-change";

/// Owns a dataset and the filter state shared by a group of charts.
///
/// Charts share one controller through `Rc<DataController>`; a mutation by
/// one chart is visible to the others immediately and announced on the bus.
/// No internal borrow is held while publishing, so subscribers may query the
/// controller from their callbacks.
pub struct DataController {
    bus: EventBus,
    data: RefCell<Rc<[DataPoint]>>,
    filters: RefCell<FilterState>,
}

impl DataController {
    pub fn new(data: Vec<DataPoint>) -> Self {
        Self::with_bus(data, EventBus::global())
    }

    pub fn with_bus(data: Vec<DataPoint>, bus: EventBus) -> Self {
        Self {
            bus,
            data: RefCell::new(data.into()),
            filters: RefCell::new(FilterState::new()),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The current dataset. Cheap to clone; never changes after return.
    pub fn snapshot(&self) -> Rc<[DataPoint]> {
        Rc::clone(&self.data.borrow())
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }

    pub fn locations(&self) -> Vec<String> {
        point::locations(&self.data.borrow())
    }

    pub fn labels(&self) -> Vec<String> {
        point::labels(&self.data.borrow())
    }

    pub fn groups(&self) -> Vec<String> {
        point::groups(&self.data.borrow())
    }

    /// Replaces the dataset and announces it with [`DATA_DID_CHANGE`].
    ///
    /// Filters are kept; keys that no longer occur simply match nothing.
    pub fn set_data(&self, data: Vec<DataPoint>, sender: &OriginToken) -> Result<(), PublishError> {
        *self.data.borrow_mut() = data.into();
        self.bus.publish(DATA_DID_CHANGE, sender, Payload::Empty)?;
        Ok(())
    }

    /// Flips membership of `key` and publishes the dimension's change event.
    pub fn toggle_filter(
        &self,
        dimension: Dimension,
        key: &str,
        sender: &OriginToken,
    ) -> Result<(), PublishError> {
        let keys = {
            let mut filters = self.filters.borrow_mut();
            let set = filters.get_mut(dimension);
            let selected = set.toggle(key);
            debug!(%dimension, key, selected, sender = %sender, "toggled filter");
            set.to_vec()
        };
        self.bus
            .publish(&dimension.did_change_event(), sender, Payload::Keys(keys))?;
        Ok(())
    }

    pub fn is_filter(&self, dimension: Dimension, key: &str) -> bool {
        self.filters.borrow().get(dimension).contains(key)
    }

    /// Empties the dimension. Always publishes, even if nothing was selected.
    pub fn clear(&self, dimension: Dimension, sender: &OriginToken) -> Result<(), PublishError> {
        self.filters.borrow_mut().get_mut(dimension).clear();
        self.bus.publish(
            &dimension.did_change_event(),
            sender,
            Payload::Keys(Vec::new()),
        )?;
        Ok(())
    }

    /// Copy of the selected keys, in selection order.
    pub fn filters(&self, dimension: Dimension) -> Vec<String> {
        self.filters.borrow().get(dimension).to_vec()
    }
}

impl std::fmt::Debug for DataController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataController")
            .field("len", &self.len())
            .field("filters", &self.filters.borrow())
            .finish()
    }
}
