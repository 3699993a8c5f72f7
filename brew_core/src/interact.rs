//! World objects the player can use. The selection collaborator resolves what
//! the player is looking at to an [`ObjectKind`]; the session dispatches to
//! the matching [`Interactable`].

use serde::{Deserialize, Serialize};

use crate::error::InteractionError;
use crate::order::OrderMachine;
use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    CupStack,
    LidStack,
    CoffeeMachine,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::CupStack => "cup_stack",
            ObjectKind::LidStack => "lid_stack",
            ObjectKind::CoffeeMachine => "coffee_machine",
        }
    }
}

pub trait Interactable {
    fn kind(&self) -> ObjectKind;

    /// Prompt shown while the object is under the cursor.
    fn label(&self) -> &str;

    fn interact(
        &self,
        order: &mut OrderMachine,
        rt: &mut Runtime<'_>,
    ) -> Result<(), InteractionError>;
}

pub struct CupDispenser;

impl Interactable for CupDispenser {
    fn kind(&self) -> ObjectKind {
        ObjectKind::CupStack
    }

    fn label(&self) -> &str {
        "Take a cup"
    }

    fn interact(
        &self,
        order: &mut OrderMachine,
        rt: &mut Runtime<'_>,
    ) -> Result<(), InteractionError> {
        order.take_cup_from_stack(rt)
    }
}

pub struct LidDispenser;

impl Interactable for LidDispenser {
    fn kind(&self) -> ObjectKind {
        ObjectKind::LidStack
    }

    fn label(&self) -> &str {
        "Take a lid"
    }

    fn interact(
        &self,
        order: &mut OrderMachine,
        rt: &mut Runtime<'_>,
    ) -> Result<(), InteractionError> {
        order.take_lid(rt)
    }
}

pub struct BrewingAppliance;

impl Interactable for BrewingAppliance {
    fn kind(&self) -> ObjectKind {
        ObjectKind::CoffeeMachine
    }

    fn label(&self) -> &str {
        "Use coffee machine"
    }

    fn interact(
        &self,
        order: &mut OrderMachine,
        rt: &mut Runtime<'_>,
    ) -> Result<(), InteractionError> {
        let action = order.interact_with_appliance(rt)?;
        log::debug!("coffee machine: {action:?}");
        Ok(())
    }
}

pub fn default_interactables() -> Vec<Box<dyn Interactable>> {
    vec![
        Box::new(CupDispenser),
        Box::new(LidDispenser),
        Box::new(BrewingAppliance),
    ]
}
