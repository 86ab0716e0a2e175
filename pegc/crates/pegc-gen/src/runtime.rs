//! Emission of the fixed parts of both artifacts: file prologues, the
//! runtime helper suite, and the public parser surface.
//!
//! Everything here is independent of the grammar's rules except for a few
//! parameters: the parser name, the `ExprResult` type, the rule count
//! (memo array size), and the root rule with its result type.

use pegc_util::indent::remove_indent;

use crate::error::Result;
use crate::{Generator, GENERATOR_VERSION};

impl Generator<'_> {
    fn banner(&self) -> String {
        format!(
            "// Generated by pegc {} from {}\n",
            GENERATOR_VERSION, self.input_filename
        )
    }

    /// Opens the implementation file: banner, include, `%cpp` block, the
    /// namespace with `ParsingFail`, and the rules section marker.
    pub(crate) fn write_implementation_prologue(&mut self) {
        let banner = self.banner();
        let include = format!("#include \"{}.hpp\"\n", self.parser_name);
        let code_block = self.grammar.code_block().map(|c| remove_indent(&c.body));

        let out = &mut self.implementation;
        out.push_str(&banner);
        out.push_str(&include);
        out.push_str("\n#include <algorithm>\n\n");

        if let Some(code) = code_block {
            out.push_str("// code from %cpp\n");
            out.push_str(&code);
            out.push_str("\n// end %cpp\n\n");
        }

        out.push_str(
            r#"namespace PegParser
{

    struct ParsingFail
    {
        std::string message;
        size_t position;
    };

    ////////// BEGINNING OF RULES //////////

"#,
        );
    }

    /// Opens the interface file: banner, include guard, standard includes,
    /// `%hpp` block, `ExprResult`, `TokenPos`, and the `Parser` class head.
    pub(crate) fn write_interface_prologue(&mut self) {
        let banner = self.banner();
        let expr_result = format!("    using ExprResult = {};\n\n", self.expr_result);
        let memo_array = format!(
            "        std::array<std::unordered_map<size_t, std::tuple<std::any, size_t>>, {}> memos;\n",
            self.rule_count()
        );
        let header_block = self.grammar.header_block().map(|h| remove_indent(&h.body));

        let out = &mut self.interface;
        out.push_str(&banner);
        out.push_str(
            r#"#ifndef PEGPARSER_HPP_
#define PEGPARSER_HPP_

#include <string>
#include <string_view>
#include <optional>
#include <functional>
#include <array>
#include <unordered_map>
#include <any>
#include <tuple>
#include <iostream>
#include <vector>

"#,
        );

        if let Some(header) = header_block {
            out.push_str("// code from %hpp\n");
            out.push_str(&header);
            out.push_str("\n// end %hpp\n\n");
        }

        out.push_str("namespace PegParser\n{\n\n");
        out.push_str(&expr_result);
        out.push_str(
            r#"    struct TokenPos
    {
        size_t startCol;
        size_t startLine;
        size_t endCol;
        size_t endLine;
    };

    class Parser
    {
    private:
        using errorHandler_t = std::function<void(std::string message, size_t position)>;
        errorHandler_t errorHandler;
        const std::string_view src;
        size_t position = 0;
"#,
        );
        out.push_str(&memo_array);
        out.push_str(
            r#"        std::vector<size_t> lineNumbers;

        ////////// BEGINNING OF RULES //////////
"#,
        );
    }

    /// Closes the implementation file: the runtime helper definitions, the
    /// public surface, and the namespace.
    pub(crate) fn write_runtime_helpers(&mut self) -> Result<()> {
        let root_call = format!("            return rule__{}();\n", self.root_rule);
        let root_null = format!("            return {};\n", self.root_type()?.null()?);

        let out = &mut self.implementation;
        out.push_str(
            r#"    ////////// END OF RULES //////////

    size_t Parser::getUtf8Size() const
    {
        if (position >= src.size()) return 0;
        auto uc = (unsigned char)src[position];
        if (uc < 128) return 1;
        else if ((uc & 0xE0) == 0xC0) return 2;
        else if ((uc & 0xF0) == 0xE0) return 3;
        else if ((uc & 0xF8) == 0xF0) return 4;
        else return 0;
    }

    size_t Parser::getUtf32Char(char32_t& c32) const
    {
        size_t n = getUtf8Size();
        if (n == 0) return 0;
        if (position + n > src.size()) return 0;

        switch(n) {
        case 1:
            c32 = src[position];
            break;
        case 2:
            if ((src[position + 1] & 0xC0) != 0x80) return 0;
            c32 = ((src[position + 0] & 0x1F) << 6) |
                  ((src[position + 1] & 0x3F));
            break;
        case 3:
            if ((src[position + 1] & 0xC0) != 0x80) return 0;
            if ((src[position + 2] & 0xC0) != 0x80) return 0;
            c32 = ((src[position + 0] & 0xF) << 12) |
                  ((src[position + 1] & 0x3F) << 6) |
                  ((src[position + 2] & 0x3F));
            break;
        case 4:
            if ((src[position + 1] & 0xC0) != 0x80) return 0;
            if ((src[position + 2] & 0xC0) != 0x80) return 0;
            if ((src[position + 3] & 0xC0) != 0x80) return 0;
            c32 = ((src[position + 0] & 0x7) << 18)  |
                  ((src[position + 1] & 0x3F) << 12) |
                  ((src[position + 2] & 0x3F) << 6)  |
                  ((src[position + 3] & 0x3F));
            break;
        }

        return n;
    }

    std::optional<std::tuple<std::any, size_t>> Parser::memoGet(size_t ruleId) const
    {
        const auto& memo = memos[ruleId];
        if (const auto search = memo.find(this->position); search != memo.cend())
        {
            return search->second;
        }
        return std::nullopt;
    }

    void Parser::memoSet(size_t ruleId, std::any value, size_t start_position)
    {
        memos[ruleId][start_position] = { value, this->position };
    }

    void Parser::parseError(const std::string& msg) const
    {
        throw ParsingFail{msg, this->position};
    }

    size_t Parser::getLineFromPosition(size_t pos) const
    {
        auto it = std::lower_bound(this->lineNumbers.cbegin(), this->lineNumbers.cend(), pos + 1);
        if (it == this->lineNumbers.cend()) return this->lineNumbers.size() + 1;
        return it - this->lineNumbers.cbegin() + 1;
    }

    size_t Parser::getColFromPosition(size_t pos, size_t line) const
    {
        if (line == 1) return pos + 1;
        return pos - this->lineNumbers[line - 2] + 1;
    }

    void Parser::calculateLineNumbers()
    {
        if (this->lineNumbers.size() != 0) return;
        for (size_t i = 0; i < this->src.size(); ++i)
            if (this->src[i] == '\n') this->lineNumbers.push_back(i + 1);
    }

    void Parser::setErrorHandler(errorHandler_t handler)
    {
        errorHandler = handler;
    }

    Parser::Result Parser::parse() noexcept
    {
        this->calculateLineNumbers();
        this->position = 0;
        try {
"#,
        );
        out.push_str(&root_call);
        out.push_str(
            r#"        } catch (const ParsingFail& error) {
            if (errorHandler) errorHandler(error.message, error.position);
            else { std::cerr << "Error at position " << error.position << ": " << error.message << std::endl; }
"#,
        );
        out.push_str(&root_null);
        out.push_str(
            r#"        }
    }

    Parser::Parser(std::string_view src) : src(src) {}

}
"#,
        );
        Ok(())
    }

    /// Closes the interface file: helper declarations, the public surface,
    /// the class and namespace, and the include guard.
    pub(crate) fn write_interface_epilogue(&mut self) -> Result<()> {
        let result_alias = format!("        using Result = {};\n", self.root_type()?);

        let out = &mut self.interface;
        out.push_str(
            r#"        ////////// END OF RULES //////////

        size_t getUtf8Size() const;
        size_t getUtf32Char(char32_t& c32) const;
        std::optional<std::tuple<std::any, size_t>> memoGet(size_t ruleId) const;
        void memoSet(size_t ruleId, std::any value, size_t start_position);
        void parseError(const std::string& msg) const;
        size_t getLineFromPosition(size_t pos) const;
        size_t getColFromPosition(size_t pos, size_t line) const;
        void calculateLineNumbers();

    public:
        void setErrorHandler(errorHandler_t handler);
"#,
        );
        out.push_str(&result_alias);
        out.push_str(
            r#"        Result parse() noexcept;

        explicit Parser(std::string_view src);
    };
}

#endif // PEGPARSER_HPP_
"#,
        );
        Ok(())
    }
}
