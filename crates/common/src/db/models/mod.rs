//! SeaORM entity models for the curation pipeline's relational schema.

mod anchor;
mod batch_log;
mod figure;
mod paper;

pub use paper::{
    Entity as PaperEntity, Model as Paper, ActiveModel as PaperActiveModel, Column as PaperColumn,
};

pub use anchor::{
    Entity as AnchorEntity, Model as Anchor, ActiveModel as AnchorActiveModel,
    Column as AnchorColumn,
};

pub use figure::{
    Entity as FigureEntity, Model as Figure, ActiveModel as FigureActiveModel,
    Column as FigureColumn,
};

pub use batch_log::{
    Entity as BatchLogEntity, Model as BatchLog, ActiveModel as BatchLogActiveModel,
    Column as BatchLogColumn,
};
