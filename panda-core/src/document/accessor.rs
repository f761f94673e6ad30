//! Scoped write access to a data value.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::data::DataId;
use crate::types::DataValue;

use super::Document;

/// Mutable access to the value of an unlinked data.
///
/// The value is moved out of the document while the accessor lives; when
/// the accessor is dropped it is put back and everything depending on the
/// data is marked dirty.
pub struct DataAccessor<'a, T: DataValue> {
    doc: &'a mut Document,
    data: DataId,
    value: Box<T>,
}

impl<'a, T: DataValue> DataAccessor<'a, T> {
    pub(crate) fn new(doc: &'a mut Document, data: DataId, value: Box<T>) -> Self {
        Self { doc, data, value }
    }

    /// The data being edited.
    pub fn data(&self) -> DataId {
        self.data
    }
}

impl<T: DataValue> Deref for DataAccessor<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: DataValue> DerefMut for DataAccessor<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: DataValue> Drop for DataAccessor<'_, T> {
    fn drop(&mut self) {
        let value = std::mem::take(&mut self.value);
        self.doc.datas.put_value(self.data, value);
        self.doc.value_changed(self.data);
    }
}

impl<T: DataValue> fmt::Debug for DataAccessor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataAccessor")
            .field("data", &self.data)
            .field("value", &self.value)
            .finish()
    }
}
