use std::collections::BTreeSet;

use log::*;
use vulkanalia::vk;

use super::backend::Backend;

/// The queue roles a selected device has to fill.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueueRole {
    Graphics,
    Presentation,
}

impl QueueRole {
    pub const COUNT: usize = 2;
    pub const ALL: [QueueRole; QueueRole::COUNT] = [QueueRole::Graphics, QueueRole::Presentation];

    const fn slot(self) -> usize {
        match self {
            QueueRole::Graphics => 0,
            QueueRole::Presentation => 1,
        }
    }
}

/// Queue family index per [`QueueRole`], `None` while a role is unresolved.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    indices: [Option<u32>; QueueRole::COUNT],
}

impl QueueFamilyIndices {
    /// Resolves the roles for `physical_device` against `surface`.
    ///
    /// An adapter without queue families, or without a family for some role,
    /// yields an incomplete result. It is up to the caller to reject it.
    pub fn resolve(
        backend: &impl Backend,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        name: &str,
    ) -> Self {
        let families = backend.queue_family_properties(physical_device);
        if families.is_empty() {
            debug!("`{}` does not report any queue families.", name);
        }

        let indices = Self::from_families(&families, |index| {
            backend
                .surface_support(physical_device, index, surface)
                .unwrap_or_else(|e| {
                    warn!(
                        "Failed to query presentation support of queue family {} on `{}`: {}",
                        index, name, e
                    );
                    false
                })
        });

        if indices.is_complete() {
            debug!("Found all required queue families on `{}`.", name);
        }
        indices
    }

    /// Picks the first family for each role. Scanning stops once every role is
    /// resolved, so later families never replace earlier ones.
    pub fn from_families<F>(families: &[vk::QueueFamilyProperties], mut can_present: F) -> Self
    where
        F: FnMut(u32) -> bool,
    {
        let mut indices = Self::default();

        for (index, family) in (0u32..).zip(families) {
            if indices.get(QueueRole::Presentation).is_none() && can_present(index) {
                indices.set(QueueRole::Presentation, index);
            }

            if indices.get(QueueRole::Graphics).is_none()
                && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            {
                indices.set(QueueRole::Graphics, index);
            }

            if indices.is_complete() {
                break;
            }
        }

        indices
    }

    fn set(&mut self, role: QueueRole, index: u32) {
        self.indices[role.slot()] = Some(index);
    }

    pub fn get(&self, role: QueueRole) -> Option<u32> {
        self.indices[role.slot()]
    }

    pub fn graphics(&self) -> Option<u32> {
        self.get(QueueRole::Graphics)
    }

    pub fn presentation(&self) -> Option<u32> {
        self.get(QueueRole::Presentation)
    }

    pub fn is_complete(&self) -> bool {
        QueueRole::ALL.iter().all(|role| self.get(*role).is_some())
    }

    /// Whether every resolved role lives in the same family, which lets
    /// resources stay in exclusive sharing mode.
    pub fn belongs_to_one_family(&self) -> bool {
        let mut resolved = self.indices.iter().flatten();
        match resolved.next() {
            Some(first) => resolved.all(|index| index == first),
            None => true,
        }
    }

    /// The distinct resolved family indices, in ascending order.
    pub fn unique_families(&self) -> Vec<u32> {
        self.indices
            .iter()
            .flatten()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
